//! Error types.
//!
//! Only [`Error`] ever reaches the caller of [`extract`](crate::extract).
//! [`EntryError`] describes why a single entry was dropped and only surfaces
//! through [`extract_with_report`](crate::extract_with_report) or the
//! lower-level [`OpenArchive`](crate::OpenArchive) API.

use std::io;

/// Fatal extraction errors. Either one aborts the whole call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The buffer could not be framed as a ZIP source.
    #[error("failed to create zip source: buffer is empty")]
    SourceCreation,

    /// The buffer could not be parsed as a ZIP archive.
    #[error("failed to open ZIP: {0}")]
    ArchiveOpen(#[from] FormatError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why an archive's central directory could not be read.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("end of central directory record not found")]
    MissingEndOfCentralDirectory,

    #[error("multi-disk archives are not supported")]
    MultiDisk,

    #[error("invalid ZIP64 end of central directory")]
    InvalidZip64,

    #[error("central directory (offset {offset}, size {size}) lies outside the archive")]
    CentralDirectoryOutOfBounds { offset: u64, size: u64 },

    #[error("invalid central directory file header for entry {index}")]
    InvalidCentralDirectoryHeader { index: u64 },

    #[error("central directory declares {declared} entries but holds {found}")]
    EntryCountMismatch { declared: u64, found: u64 },

    #[error("truncated record: {0}")]
    Truncated(#[from] io::Error),
}

/// A fault confined to one entry. The entry is skipped; extraction goes on.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("no entry at index {0}")]
    NoSuchEntry(usize),

    #[error("entry name is flagged UTF-8 but is not valid UTF-8")]
    InvalidName,

    #[error("ZIP64 extra field is missing the {0}")]
    MissingZip64Field(&'static str),

    #[error("entry is encrypted")]
    Encrypted,

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error("invalid local file header")]
    InvalidLocalHeader,

    #[error("entry data lies outside the archive")]
    DataOutOfBounds,

    #[error("cannot allocate {0} bytes for entry content")]
    Allocation(u64),

    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: u64, actual: u64 },

    #[error("CRC-32 mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("decompression failed: {0}")]
    Io(#[from] io::Error),
}
