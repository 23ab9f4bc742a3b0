use byteorder::{LittleEndian, ReadBytesExt};
use flate2::Crc;
use std::io::{self, Cursor};

use crate::error::{EntryError, FormatError};

use super::cp437;

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// General purpose flag: entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;
/// General purpose flag: name and comment are UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;

/// Extra field holding 64-bit sizes and offsets.
pub const EXTRA_ZIP64: u16 = 0x0001;
/// Info-ZIP Unicode Path extra field.
pub const EXTRA_UNICODE_PATH: u16 = 0x7075;

const U32_SENTINEL: u32 = 0xFFFF_FFFF;

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(FormatError::MissingEndOfCentralDirectory);
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn is_multi_disk(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0 || self.disk_entries != self.total_entries
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(FormatError::InvalidZip64);
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(FormatError::InvalidZip64);
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>()?,
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            disk_with_cd: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }

    pub fn is_multi_disk(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0 || self.disk_entries != self.total_entries
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// A central directory file header as stored, with the variable-length
/// fields borrowed from the archive buffer.
///
/// Nothing here is interpreted beyond framing; [`CentralDirectoryHeader::stat`]
/// resolves names and ZIP64 values per entry.
#[derive(Debug, Clone, Copy)]
pub struct CentralDirectoryHeader<'a> {
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub lfh_offset: u32,
    pub file_name: &'a [u8],
    pub extra_field: &'a [u8],
}

impl<'a> CentralDirectoryHeader<'a> {
    /// Parse one header at the cursor position and advance past it,
    /// including its trailing comment.
    pub fn parse(cursor: &mut Cursor<&'a [u8]>, index: u64) -> Result<Self, FormatError> {
        let sig = take(cursor, 4)?;
        if sig != CDFH_SIGNATURE {
            return Err(FormatError::InvalidCentralDirectoryHeader { index });
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let lfh_offset = cursor.read_u32::<LittleEndian>()?;

        let file_name = take(cursor, file_name_length as usize)?;
        let extra_field = take(cursor, extra_field_length as usize)?;
        let _comment = take(cursor, file_comment_length as usize)?;

        Ok(Self {
            flags,
            compression_method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size,
            uncompressed_size,
            lfh_offset,
            file_name,
            extra_field,
        })
    }

    /// Iterate over the `(header id, payload)` pairs of the extra field.
    /// Iteration stops at the first truncated field.
    pub fn extra_fields(&self) -> ExtraFields<'a> {
        ExtraFields {
            data: self.extra_field,
        }
    }

    /// Resolve `(uncompressed size, compressed size, local header offset)`,
    /// reading the ZIP64 extra field for any value stored as a sentinel.
    pub fn resolve_sizes(&self) -> Result<(u64, u64, u64), EntryError> {
        let mut uncompressed_size = self.uncompressed_size as u64;
        let mut compressed_size = self.compressed_size as u64;
        let mut lfh_offset = self.lfh_offset as u64;

        let needs_uncompressed = self.uncompressed_size == U32_SENTINEL;
        let needs_compressed = self.compressed_size == U32_SENTINEL;
        let needs_offset = self.lfh_offset == U32_SENTINEL;
        if !(needs_uncompressed || needs_compressed || needs_offset) {
            return Ok((uncompressed_size, compressed_size, lfh_offset));
        }

        let payload = self
            .extra_fields()
            .find(|(id, _)| *id == EXTRA_ZIP64)
            .map(|(_, payload)| payload)
            .unwrap_or_default();
        let mut cursor = Cursor::new(payload);

        // Fields appear only when the matching header field is a sentinel,
        // always in this order.
        if needs_uncompressed {
            uncompressed_size = cursor
                .read_u64::<LittleEndian>()
                .map_err(|_| EntryError::MissingZip64Field("uncompressed size"))?;
        }
        if needs_compressed {
            compressed_size = cursor
                .read_u64::<LittleEndian>()
                .map_err(|_| EntryError::MissingZip64Field("compressed size"))?;
        }
        if needs_offset {
            lfh_offset = cursor
                .read_u64::<LittleEndian>()
                .map_err(|_| EntryError::MissingZip64Field("local header offset"))?;
        }

        Ok((uncompressed_size, compressed_size, lfh_offset))
    }

    /// Decode the entry name.
    ///
    /// A Unicode Path extra field wins when its checksum matches the raw
    /// name. Otherwise a name flagged UTF-8 must be valid UTF-8; unflagged
    /// names are kept when they happen to be UTF-8 and read as CP437
    /// otherwise.
    pub fn decode_name(&self) -> Result<String, EntryError> {
        if let Some(name) = self.unicode_path() {
            return Ok(name);
        }

        if self.flags & FLAG_UTF8 != 0 {
            return String::from_utf8(self.file_name.to_vec()).map_err(|_| EntryError::InvalidName);
        }

        Ok(cp437::decode(self.file_name))
    }

    fn unicode_path(&self) -> Option<String> {
        let (_, payload) = self
            .extra_fields()
            .find(|(id, _)| *id == EXTRA_UNICODE_PATH)?;

        let mut cursor = Cursor::new(payload);
        let version = cursor.read_u8().ok()?;
        let name_crc = cursor.read_u32::<LittleEndian>().ok()?;
        if version != 1 {
            return None;
        }

        let mut crc = Crc::new();
        crc.update(self.file_name);
        if crc.sum() != name_crc {
            return None;
        }

        std::str::from_utf8(&payload[5..]).ok().map(str::to_owned)
    }

    /// Build the per-entry metadata, failing only when the name or the
    /// ZIP64 values cannot be resolved.
    pub fn stat(&self, index: usize) -> Result<EntryStat, EntryError> {
        let name = self.decode_name()?;
        let (uncompressed_size, compressed_size, lfh_offset) = self.resolve_sizes()?;
        let is_directory = name.ends_with('/');

        Ok(EntryStat {
            index,
            name,
            compression_method: CompressionMethod::from_u16(self.compression_method),
            compressed_size,
            uncompressed_size,
            crc32: self.crc32,
            flags: self.flags,
            lfh_offset,
            last_mod_time: self.last_mod_time,
            last_mod_date: self.last_mod_date,
            is_directory,
        })
    }
}

/// Iterator over extra field records.
pub struct ExtraFields<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for ExtraFields<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < 4 {
            return None;
        }
        let id = u16::from_le_bytes([self.data[0], self.data[1]]);
        let size = u16::from_le_bytes([self.data[2], self.data[3]]) as usize;
        let rest = &self.data[4..];
        if rest.len() < size {
            self.data = &[];
            return None;
        }
        let (payload, tail) = rest.split_at(size);
        self.data = tail;
        Some((id, payload))
    }
}

/// Fixed part of a Local File Header.
pub struct LocalFileHeader {
    pub compression_method: u16,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub fn from_bytes(data: &[u8]) -> Result<Self, EntryError> {
        if data.len() < LFH_SIZE || &data[0..4] != LFH_SIGNATURE {
            return Err(EntryError::InvalidLocalHeader);
        }

        let mut cursor = Cursor::new(&data[4..]);
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        // Offset to filename length field
        cursor.set_position(22);
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;

        Ok(Self {
            compression_method,
            file_name_length,
            extra_field_length,
        })
    }

    /// Bytes from the start of the header to the start of the entry data.
    pub fn total_size(&self) -> u64 {
        LFH_SIZE as u64 + self.file_name_length as u64 + self.extra_field_length as u64
    }
}

/// Metadata for one archive entry.
#[derive(Debug, Clone)]
pub struct EntryStat {
    /// Position in the central directory.
    pub index: usize,
    /// Name as stored, not normalized.
    pub name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub flags: u16,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    /// Name ends with `/`.
    pub is_directory: bool,
}

impl EntryStat {
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

/// Borrow the next `len` bytes of the cursor's buffer and advance past them.
fn take<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> Result<&'a [u8], FormatError> {
    let data: &'a [u8] = *cursor.get_ref();
    let start = cursor.position() as usize;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
    cursor.set_position(end as u64);
    Ok(&data[start..end])
}
