//! Main entry point for the bufzip CLI application.
//!
//! Loads a ZIP archive from the local filesystem or an HTTP URL into
//! memory, then lists it or extracts its regular files.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio::io::AsyncWriteExt;

use bufzip::{
    Cli, ExtractedFile, Extraction, Fetch, HttpSource, LocalSource, OpenArchive,
    extract_with_report,
};

/// Application entry point.
///
/// Parses command-line arguments, loads the archive buffer and dispatches
/// to listing or extraction.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    if cli.is_http_url() {
        let source = HttpSource::new(cli.file.clone())?;
        let data = load(&source).await?;

        process_zip(data, &cli).await?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(source.transferred_bytes())
            );
        }
    } else {
        let source = LocalSource::new(&cli.file);
        let data = load(&source).await?;
        process_zip(data, &cli).await?;
    }

    Ok(())
}

/// Read the whole archive into memory.
async fn load(source: &dyn Fetch) -> Result<Vec<u8>> {
    let data = source
        .fetch()
        .await
        .with_context(|| format!("failed to load {}", source.location()))?;
    info!("loaded {} ({} bytes)", source.location(), data.len());
    Ok(data)
}

/// List or extract an archive buffer according to the CLI options.
async fn process_zip(data: Vec<u8>, cli: &Cli) -> Result<()> {
    if cli.list || cli.verbose {
        return list_files(&data, cli.verbose);
    }

    // Extraction never yields, so it runs on the blocking pool.
    let extraction = tokio::task::spawn_blocking(move || extract_with_report(&data))
        .await
        .context("extraction task failed")??;

    report_skipped(&extraction, cli);

    let files_to_extract: Vec<_> = extraction
        .files
        .iter()
        .filter(|f| cli.selects(&f.filename))
        .collect();

    let multiple_files = cli.pipe && files_to_extract.len() > 1;
    for file in files_to_extract {
        extract_file(file, cli, multiple_files).await?;
    }

    Ok(())
}

/// List the entries of the archive, directories included.
///
/// Simple format (`-l`) prints one name per line; verbose format (`-v`)
/// prints a table with sizes, compression ratio and timestamps.
fn list_files(data: &[u8], verbose: bool) -> Result<()> {
    let archive = OpenArchive::open(data)?;

    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for (index, entry) in archive.entries().enumerate() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("entry {}: {}", index, e);
                continue;
            }
        };

        if !verbose {
            println!("{}", entry.name);
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        // Percentage saved; stored entries can come out negative
        let ratio = if entry.uncompressed_size > 0 {
            format!(
                "{:>4}%",
                100 - (entry.compressed_size as i128 * 100 / entry.uncompressed_size as i128)
            )
        } else {
            "  0%".to_string()
        };

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio,
            year,
            month,
            day,
            hour,
            minute,
            entry.name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        let total_ratio = if total_uncompressed > 0 {
            format!(
                "{:>4}%",
                100 - (total_compressed as i128 * 100 / total_uncompressed as i128)
            )
        } else {
            "  0%".to_string()
        };
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            total_uncompressed, total_compressed, total_ratio, "", file_count
        );
    }

    Ok(())
}

/// Tell the user about entries that could not be extracted.
///
/// With `-s` every skipped entry is printed with its reason; otherwise a
/// single warning carries the count.
fn report_skipped(extraction: &Extraction, cli: &Cli) {
    if extraction.is_complete() {
        return;
    }

    if cli.report_skipped {
        for skipped in &extraction.skipped {
            let name = skipped
                .name
                .clone()
                .unwrap_or_else(|| format!("#{}", skipped.index));
            eprintln!("    skipped: {} ({})", name, skipped.reason);
        }
    } else {
        warn!(
            "{} entries could not be extracted (use -s to list them)",
            extraction.skipped.len()
        );
    }
}

/// Write one extracted file to stdout or disk.
///
/// Handles pipe mode (`-p`), the output directory (`-d`), junk paths (`-j`)
/// and the overwrite options (`-n`, `-o`).
async fn extract_file(file: &ExtractedFile, cli: &Cli, show_filename: bool) -> Result<()> {
    if cli.pipe {
        let mut stdout = tokio::io::stdout();
        if show_filename {
            stdout
                .write_all(format!("--- {} ---\n", file.filename).as_bytes())
                .await?;
        }
        stdout.write_all(file.as_bytes()).await?;
        stdout.flush().await?;
        return Ok(());
    }

    let Some(output_path) = cli.output_path(&file.filename) else {
        warn!("Skipping: {} (path escapes the output directory)", file.filename);
        return Ok(());
    };

    if tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (file exists)", file.filename);
            }
            return Ok(());
        }

        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", file.filename);
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", file.filename);
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut out = tokio::fs::File::create(&output_path)
        .await
        .with_context(|| format!("failed to create {}", output_path.display()))?;
    out.write_all(file.as_bytes()).await?;
    out.flush().await?;

    Ok(())
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
