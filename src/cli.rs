use clap::Parser;
use std::path::{Component, Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "bufzip")]
#[command(version)]
#[command(about = "Extract every regular file from a ZIP archive loaded into memory", long_about = None)]
#[command(after_help = "Examples:\n  \
  bufzip data1.zip -x joe        extract all files except joe from data1.zip\n  \
  bufzip -p foo.zip | more       send contents of foo.zip via pipe into more\n  \
  bufzip -l https://example.com/archive.zip   list files from remote ZIP\n  \
  bufzip -s broken.zip           extract what is readable, report what was skipped")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Files to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely/show version info
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Report every entry skipped as unreadable
    #[arg(short = 's', long = "skipped")]
    pub report_skipped: bool,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default `env_logger` filter for this invocation.
    pub fn log_level(&self) -> &'static str {
        if self.is_very_quiet() {
            "off"
        } else if self.is_quiet() {
            "error"
        } else {
            "warn"
        }
    }

    /// Whether an extracted file passes the FILES and `-x` filters.
    pub fn selects(&self, name: &str) -> bool {
        if !self.files.is_empty() {
            let matches = self.files.iter().any(|f| {
                if has_glob_chars(f) {
                    glob_match(f, name)
                } else {
                    // No wildcards: exact match on filename or full path
                    name == f.as_str() || base_name(name) == f.as_str()
                }
            });
            if !matches {
                return false;
            }
        }

        !self
            .exclude
            .iter()
            .any(|x| name.contains(x.as_str()) || glob_match(x, name))
    }

    /// Where an entry named `name` is written, or `None` if the name would
    /// escape the output directory.
    pub fn output_path(&self, name: &str) -> Option<PathBuf> {
        let relative = if self.junk_paths {
            PathBuf::from(base_name(name))
        } else {
            if !is_contained(Path::new(name)) {
                return None;
            }
            PathBuf::from(name)
        };

        if relative.as_os_str().is_empty() {
            return None;
        }

        Some(match self.extract_dir {
            Some(ref dir) => PathBuf::from(dir).join(relative),
            None => relative,
        })
    }
}

/// Last `/`-separated component of an archive name.
pub fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// A relative path with no `..` component.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Check if a pattern contains glob wildcard characters.
pub fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            // Either skip the star or let it swallow one more character
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}
