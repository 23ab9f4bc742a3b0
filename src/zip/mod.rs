//! In-memory ZIP archive parsing and extraction.
//!
//! ## Architecture
//!
//! - [`source`]: zero-copy view over the caller's buffer
//! - [`structures`]: ZIP format records (EOCD, file headers, entry metadata)
//! - [`cp437`]: decoding of names stored without the UTF-8 flag
//! - [`parser`]: locating and framing the central directory
//! - [`archive`]: the opened archive, with per-entry stat and open
//! - [`reader`]: decompressing, CRC-checking entry reader
//! - [`extractor`]: the best-effort extraction pipeline
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first, then the Central Directory, and entry data is
//! reached through each entry's Local File Header.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - STORED and DEFLATE compression methods
//! - UTF-8 flagged names, CP437 fallback for unflagged names, and the
//!   Info-ZIP Unicode Path extra field
//!
//! ## Limitations
//!
//! - No encryption support (encrypted entries are skipped)
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods (such entries are skipped)

pub mod archive;
pub mod cp437;
pub mod extractor;
pub mod parser;
pub mod reader;
pub mod source;
pub mod structures;

pub use archive::OpenArchive;
pub use extractor::{
    ExtractedFile, Extraction, SkipReason, SkippedEntry, extract, extract_with_report,
};
pub use parser::ZipParser;
pub use reader::EntryReader;
pub use source::ArchiveSource;
pub use structures::*;
