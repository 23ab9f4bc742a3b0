use log::debug;

use crate::error::{EntryError, Result};

use super::parser::ZipParser;
use super::reader::EntryReader;
use super::source::ArchiveSource;
use super::structures::{CentralDirectoryHeader, EntryStat};

/// A parsed archive: the central directory index over a borrowed buffer.
///
/// Everything it holds borrows from the caller's buffer or is owned by it,
/// so dropping it releases all archive state.
pub struct OpenArchive<'a> {
    parser: ZipParser<'a>,
    headers: Vec<CentralDirectoryHeader<'a>>,
}

impl<'a> OpenArchive<'a> {
    /// Frame `data` as a source and parse its central directory.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        Self::from_source(ArchiveSource::new(data)?)
    }

    pub fn from_source(source: ArchiveSource<'a>) -> Result<Self> {
        let parser = ZipParser::new(source);
        let headers = parser.read_central_directory()?;
        debug!(
            "opened ZIP archive: {} bytes, {} entries",
            source.size(),
            headers.len()
        );
        Ok(Self { parser, headers })
    }

    /// Number of entries in the central directory, directories included.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Metadata for entry `index`.
    pub fn stat(&self, index: usize) -> std::result::Result<EntryStat, EntryError> {
        self.headers
            .get(index)
            .ok_or(EntryError::NoSuchEntry(index))?
            .stat(index)
    }

    /// Metadata for every entry, in central directory order.
    pub fn entries(&self) -> impl Iterator<Item = std::result::Result<EntryStat, EntryError>> + '_ {
        (0..self.len()).map(|index| self.stat(index))
    }

    /// Open entry `index` for reading.
    pub fn open_entry(&self, index: usize) -> std::result::Result<EntryReader<'a>, EntryError> {
        let stat = self.stat(index)?;
        self.entry_reader(&stat)
    }

    /// Open the entry described by an already-resolved `stat`.
    pub fn entry_reader(&self, stat: &EntryStat) -> std::result::Result<EntryReader<'a>, EntryError> {
        if stat.is_encrypted() {
            return Err(EntryError::Encrypted);
        }

        let data_offset = self.parser.get_data_offset(stat)?;
        let data = self
            .parser
            .source()
            .slice_at(data_offset, stat.compressed_size)
            .ok_or(EntryError::DataOutOfBounds)?;

        EntryReader::new(stat, data)
    }
}
