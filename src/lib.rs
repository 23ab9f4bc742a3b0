//! # bufzip
//!
//! Best-effort extraction of every regular file from a ZIP archive held in
//! memory.
//!
//! The core is a single call: hand [`extract`] a byte buffer and get back
//! the archive's regular files, in central directory order, each with its
//! complete decompressed content. Directory entries are left out. An entry
//! that cannot be read (bad header, unsupported method, encryption,
//! truncation, CRC mismatch) is skipped rather than failing the whole call;
//! only an empty buffer or an unparseable central directory is an error.
//! [`extract_with_report`] returns the same files plus a list of what was
//! skipped and why.
//!
//! The buffer is borrowed, never copied, and extraction runs synchronously
//! on the calling thread. Independent calls share no state.
//!
//! The [`io`] and [`cli`] modules back the `bufzip` binary, which loads an
//! archive from a local path or an HTTP URL and lists or extracts it.
//!
//! ## Example
//!
//! ```no_run
//! use bufzip::{Error, extract_with_report};
//!
//! fn main() -> Result<(), Error> {
//!     let buffer = std::fs::read("archive.zip").unwrap_or_default();
//!     let extraction = extract_with_report(&buffer)?;
//!     for file in &extraction.files {
//!         println!("{} ({} bytes)", file.filename, file.len());
//!     }
//!     for skipped in &extraction.skipped {
//!         eprintln!("skipped entry {}: {}", skipped.index, skipped.reason);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{EntryError, Error, FormatError, Result};
pub use io::{Fetch, HttpSource, LocalSource};
pub use crate::zip::{
    EntryStat, ExtractedFile, Extraction, OpenArchive, SkipReason, SkippedEntry, extract,
    extract_with_report,
};
