use crate::error::{Error, Result};

/// Read-only, zero-copy view over a caller-supplied ZIP buffer.
///
/// The view borrows the buffer, so it can never outlive it, and every
/// sub-slice it hands out borrows the same storage.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveSource<'a> {
    data: &'a [u8],
}

impl<'a> ArchiveSource<'a> {
    /// Frame `data` as a source. An empty buffer cannot hold an archive.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::SourceCreation);
        }
        Ok(Self { data })
    }

    /// Total size of the buffer in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Borrow `len` bytes starting at `offset`, or `None` if the range
    /// does not fit inside the buffer.
    pub fn slice_at(&self, offset: u64, len: u64) -> Option<&'a [u8]> {
        let end = offset.checked_add(len)?;
        if end > self.size() {
            return None;
        }
        Some(&self.data[offset as usize..end as usize])
    }

    /// Borrow everything from `offset` to the end of the buffer.
    pub fn slice_from(&self, offset: u64) -> Option<&'a [u8]> {
        if offset > self.size() {
            return None;
        }
        Some(&self.data[offset as usize..])
    }
}
