use crate::error::{EntryError, Result};

use super::archive::OpenArchive;

/// A regular file pulled out of an archive.
///
/// `filename` is the name as stored in the archive. It is not normalized
/// and may contain `..` or an absolute path; consumers that write to disk
/// must sanitize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl ExtractedFile {
    /// Raw view of the decompressed content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.filename, self.data)
    }
}

/// The step at which an entry was given up on.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("stat failed: {0}")]
    Stat(EntryError),
    #[error("open failed: {0}")]
    Open(EntryError),
    #[error("read failed: {0}")]
    Read(EntryError),
}

/// An entry left out of the result.
#[derive(Debug)]
pub struct SkippedEntry {
    pub index: usize,
    /// `None` when the entry could not even be stat'd.
    pub name: Option<String>,
    pub reason: SkipReason,
}

/// Extracted files plus the entries that were dropped along the way.
#[derive(Debug, Default)]
pub struct Extraction {
    pub files: Vec<ExtractedFile>,
    pub skipped: Vec<SkippedEntry>,
}

impl Extraction {
    /// `true` if no entry was dropped.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    fn skip(&mut self, index: usize, name: Option<String>, reason: SkipReason) {
        self.skipped.push(SkippedEntry {
            index,
            name,
            reason,
        });
    }
}

/// Extract every regular file from an in-memory ZIP archive.
///
/// Files come back in central directory order. Directory entries are left
/// out, and so is any entry that cannot be stat'd, opened, or fully read;
/// those are dropped silently. Only two conditions fail the call:
/// [`Error::SourceCreation`](crate::Error::SourceCreation) for an empty
/// buffer and [`Error::ArchiveOpen`](crate::Error::ArchiveOpen) when the
/// central directory cannot be parsed.
///
/// ```no_run
/// let buffer = std::fs::read("archive.zip")?;
/// for file in bufzip::extract(&buffer)? {
///     println!("{}: {} bytes", file.filename, file.len());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn extract(data: &[u8]) -> Result<Vec<ExtractedFile>> {
    extract_with_report(data).map(|extraction| extraction.files)
}

/// Like [`extract`], but also reports every entry that was skipped and why.
pub fn extract_with_report(data: &[u8]) -> Result<Extraction> {
    let archive = OpenArchive::open(data)?;

    let mut extraction = Extraction {
        files: Vec::with_capacity(archive.len()),
        skipped: Vec::new(),
    };

    for index in 0..archive.len() {
        let stat = match archive.stat(index) {
            Ok(stat) => stat,
            Err(e) => {
                extraction.skip(index, None, SkipReason::Stat(e));
                continue;
            }
        };

        if stat.is_directory {
            continue;
        }

        let reader = match archive.entry_reader(&stat) {
            Ok(reader) => reader,
            Err(e) => {
                extraction.skip(index, Some(stat.name), SkipReason::Open(e));
                continue;
            }
        };

        match reader.read_to_vec() {
            Ok(data) => extraction.files.push(ExtractedFile {
                filename: stat.name,
                data,
            }),
            Err(e) => extraction.skip(index, Some(stat.name), SkipReason::Read(e)),
        }
    }

    Ok(extraction)
}
