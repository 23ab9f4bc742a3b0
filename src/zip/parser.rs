//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures directly
//! from an [`ArchiveSource`], without copying the buffer.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the buffer's end
//! 2. If a ZIP64 locator precedes it, read the ZIP64 EOCD instead
//! 3. Walk the Central Directory to frame every entry header
//! 4. For extraction, read each entry's Local File Header to find its data

use std::io::Cursor;

use crate::error::{EntryError, FormatError};

use super::source::ArchiveSource;
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP parser over a borrowed buffer.
///
/// Typically used through [`OpenArchive`](super::OpenArchive)
/// rather than directly.
#[derive(Debug, Clone, Copy)]
pub struct ZipParser<'a> {
    source: ArchiveSource<'a>,
}

impl<'a> ZipParser<'a> {
    pub fn new(source: ArchiveSource<'a>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> ArchiveSource<'a> {
        self.source
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Returns the record and its offset in the buffer. When the archive has
    /// a comment, the buffer tail is searched backwards for the signature.
    /// A candidate is accepted when its comment fits inside the buffer and
    /// the directory it declares starts with a file header, so a signature
    /// embedded in the comment is passed over. If no candidate points at a
    /// directory, the last one whose comment fits is used.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64), FormatError> {
        let (eocd, offset, _) = self.find_directory()?;
        Ok((eocd, offset))
    }

    /// Locate the central directory: `(offset, size, declared entry count)`.
    ///
    /// The ZIP64 record is followed only when its locator sits right before
    /// the regular EOCD. Sentinel values in an EOCD without a locator are
    /// taken literally: an archive of exactly 65535 entries stores 0xFFFF
    /// without needing ZIP64.
    pub fn locate_central_directory(&self) -> Result<(u64, u64, u64), FormatError> {
        let (_, _, location) = self.find_directory()?;
        Ok(location)
    }

    fn find_directory(&self) -> Result<(EndOfCentralDirectory, u64, (u64, u64, u64)), FormatError> {
        let size = self.source.size();
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if size < eocd_size {
            return Err(FormatError::MissingEndOfCentralDirectory);
        }

        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(size);
        let search_start = size - search_size;
        let buf = self
            .source
            .slice_from(search_start)
            .ok_or(FormatError::MissingEndOfCentralDirectory)?;

        let mut fallback = None;
        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
            if i + EndOfCentralDirectory::SIZE + comment_len > buf.len() {
                continue;
            }

            let offset = search_start + i as u64;
            let eocd = EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
            match self.resolve_directory(&eocd, offset) {
                Ok((location, end)) if self.starts_directory(location, end) => {
                    return Ok((eocd, offset, location));
                }
                result => {
                    if fallback.is_none() {
                        fallback = Some(result.map(|(location, _)| (eocd, offset, location)));
                    }
                }
            }
        }

        fallback.unwrap_or(Err(FormatError::MissingEndOfCentralDirectory))
    }

    /// Read the directory location declared by the EOCD at `eocd_offset`,
    /// plus the offset where the directory should end.
    fn resolve_directory(
        &self,
        eocd: &EndOfCentralDirectory,
        eocd_offset: u64,
    ) -> Result<((u64, u64, u64), u64), FormatError> {
        if let Some(locator) = self.find_zip64_locator(eocd_offset) {
            let eocd64 = self.read_zip64_eocd(&locator)?;
            if eocd64.is_multi_disk() {
                return Err(FormatError::MultiDisk);
            }
            return Ok((
                (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries),
                locator.eocd64_offset,
            ));
        }

        if eocd.is_multi_disk() {
            return Err(FormatError::MultiDisk);
        }
        Ok((
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            ),
            eocd_offset,
        ))
    }

    /// Whether a declared directory is backed by the buffer: a non-empty
    /// one begins with a file header signature, an empty one ends where
    /// the end records begin.
    fn starts_directory(&self, (cd_offset, cd_size, total_entries): (u64, u64, u64), end: u64) -> bool {
        if total_entries == 0 {
            return cd_size == 0 && cd_offset == end;
        }
        self.source.slice_at(cd_offset, 4) == Some(CDFH_SIGNATURE)
    }

    /// The ZIP64 locator immediately before the regular EOCD, if present.
    pub fn find_zip64_locator(&self, eocd_offset: u64) -> Option<Zip64EOCDLocator> {
        let locator_offset = eocd_offset.checked_sub(Zip64EOCDLocator::SIZE as u64)?;
        let buf = self
            .source
            .slice_at(locator_offset, Zip64EOCDLocator::SIZE as u64)?;
        Zip64EOCDLocator::from_bytes(buf).ok()
    }

    /// Read the ZIP64 End of Central Directory record a locator points at.
    pub fn read_zip64_eocd(&self, locator: &Zip64EOCDLocator) -> Result<Zip64EOCD, FormatError> {
        if locator.total_disks > 1 || locator.disk_with_eocd64 != 0 {
            return Err(FormatError::MultiDisk);
        }

        let eocd64_buf = self
            .source
            .slice_at(locator.eocd64_offset, Zip64EOCD::MIN_SIZE as u64)
            .ok_or(FormatError::InvalidZip64)?;
        Zip64EOCD::from_bytes(eocd64_buf)
    }

    /// Frame every Central Directory File Header, in directory order.
    ///
    /// Fails if the directory lies outside the buffer, a header is malformed,
    /// or the directory holds fewer headers than the EOCD declares.
    pub fn read_central_directory(&self) -> Result<Vec<CentralDirectoryHeader<'a>>, FormatError> {
        let (cd_offset, cd_size, total_entries) = self.locate_central_directory()?;

        let cd_data = self.source.slice_at(cd_offset, cd_size).ok_or(
            FormatError::CentralDirectoryOutOfBounds {
                offset: cd_offset,
                size: cd_size,
            },
        )?;

        // The declared count is untrusted; never reserve more headers than
        // the directory could physically hold.
        let capacity = total_entries.min((cd_data.len() / CDFH_MIN_SIZE) as u64) as usize;
        let mut headers = Vec::with_capacity(capacity);
        let mut cursor = Cursor::new(cd_data);

        for index in 0..total_entries {
            if cursor.position() >= cd_data.len() as u64 {
                return Err(FormatError::EntryCountMismatch {
                    declared: total_entries,
                    found: index,
                });
            }
            headers.push(CentralDirectoryHeader::parse(&mut cursor, index)?);
        }

        Ok(headers)
    }

    /// Get the offset where an entry's (possibly compressed) data begins.
    ///
    /// The Local File Header has its own name and extra field lengths,
    /// which may differ from the central directory copy. Its compression
    /// method must agree with the directory's.
    pub fn get_data_offset(&self, entry: &EntryStat) -> Result<u64, EntryError> {
        let lfh_buf = self
            .source
            .slice_at(entry.lfh_offset, LFH_SIZE as u64)
            .ok_or(EntryError::InvalidLocalHeader)?;
        let lfh = LocalFileHeader::from_bytes(lfh_buf)?;
        if lfh.compression_method != entry.compression_method.as_u16() {
            return Err(EntryError::InvalidLocalHeader);
        }

        entry
            .lfh_offset
            .checked_add(lfh.total_size())
            .ok_or(EntryError::DataOutOfBounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use ::zip::write::SimpleFileOptions;

    fn build(entries: &[(&str, &[u8])], comment: Option<&str>) -> Vec<u8> {
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer
                .start_file(
                    *name,
                    SimpleFileOptions::default().compression_method(::zip::CompressionMethod::Stored),
                )
                .unwrap();
            writer.write_all(data).unwrap();
        }
        if let Some(comment) = comment {
            writer.set_comment(comment);
        }
        writer.finish().unwrap().into_inner()
    }

    fn parse(data: &[u8]) -> Result<Vec<CentralDirectoryHeader<'_>>, FormatError> {
        ZipParser::new(ArchiveSource::new(data).unwrap()).read_central_directory()
    }

    #[test]
    fn reads_directory_in_order() {
        let data = build(&[("b.txt", b"bee"), ("a.txt", b"ay")], None);
        let headers = parse(&data).unwrap();
        let names: Vec<_> = headers.iter().map(|h| h.file_name).collect();
        assert_eq!(names, vec![&b"b.txt"[..], &b"a.txt"[..]]);
    }

    #[test]
    fn finds_eocd_behind_comment() {
        let data = build(&[("a.txt", b"ay")], Some("built by the parser tests"));
        let parser = ZipParser::new(ArchiveSource::new(&data).unwrap());
        let (eocd, offset) = parser.find_eocd().unwrap();
        assert_eq!(eocd.total_entries, 1);
        assert_eq!(
            offset + EndOfCentralDirectory::SIZE as u64 + eocd.comment_len as u64,
            data.len() as u64
        );
        assert_eq!(parse(&data).unwrap().len(), 1);
    }

    #[test]
    fn skips_eocd_signature_inside_comment() {
        // A record in the comment declaring one entry at offset 0, where the
        // local header (not a directory header) lives.
        let mut fake = Vec::new();
        fake.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
        fake.extend_from_slice(&[0, 0, 0, 0, 1, 0, 1, 0]);
        fake.extend_from_slice(&46u32.to_le_bytes());
        fake.extend_from_slice(&0u32.to_le_bytes());
        fake.extend_from_slice(&0u16.to_le_bytes());
        let mut comment = String::from_utf8(fake).unwrap();
        comment.push_str(" trailing comment text");

        let data = build(&[("a.txt", b"ay"), ("b.txt", b"bee")], Some(comment.as_str()));
        let parser = ZipParser::new(ArchiveSource::new(&data).unwrap());
        let (eocd, offset) = parser.find_eocd().unwrap();
        assert_eq!(eocd.total_entries, 2);
        assert_eq!(eocd.comment_len as usize, comment.len());
        assert_eq!(
            offset + EndOfCentralDirectory::SIZE as u64 + eocd.comment_len as u64,
            data.len() as u64
        );
        assert_eq!(parse(&data).unwrap().len(), 2);
    }

    #[test]
    fn follows_zip64_locator() {
        let data = build(&[("a.txt", b"ay"), ("b.txt", b"bee")], None);
        let eocd_offset = data.len() - EndOfCentralDirectory::SIZE;
        let eocd = EndOfCentralDirectory::from_bytes(&data[eocd_offset..]).unwrap();

        // Rewrite the tail as ZIP64 record + locator + EOCD full of sentinels.
        let mut zip64 = data[..eocd_offset].to_vec();
        let record_offset = zip64.len() as u64;
        zip64.extend_from_slice(Zip64EOCD::SIGNATURE);
        zip64.extend_from_slice(&44u64.to_le_bytes());
        zip64.extend_from_slice(&[45, 0, 45, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        zip64.extend_from_slice(&2u64.to_le_bytes());
        zip64.extend_from_slice(&2u64.to_le_bytes());
        zip64.extend_from_slice(&(eocd.cd_size as u64).to_le_bytes());
        zip64.extend_from_slice(&(eocd.cd_offset as u64).to_le_bytes());
        zip64.extend_from_slice(Zip64EOCDLocator::SIGNATURE);
        zip64.extend_from_slice(&0u32.to_le_bytes());
        zip64.extend_from_slice(&record_offset.to_le_bytes());
        zip64.extend_from_slice(&1u32.to_le_bytes());
        zip64.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
        zip64.extend_from_slice(&[0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
        zip64.extend_from_slice(&[0xFF; 8]);
        zip64.extend_from_slice(&[0, 0]);

        let parser = ZipParser::new(ArchiveSource::new(&zip64).unwrap());
        let new_eocd_offset = (zip64.len() - EndOfCentralDirectory::SIZE) as u64;
        let locator = parser.find_zip64_locator(new_eocd_offset).unwrap();
        assert_eq!(locator.eocd64_offset, record_offset);
        assert_eq!(
            parser.locate_central_directory().unwrap(),
            (eocd.cd_offset as u64, eocd.cd_size as u64, 2)
        );
        assert_eq!(parse(&zip64).unwrap().len(), 2);

        // A locator pointing at garbage is fatal rather than ignored.
        let locator_offset = new_eocd_offset as usize - Zip64EOCDLocator::SIZE;
        zip64[locator_offset + 8..locator_offset + 16].copy_from_slice(&0u64.to_le_bytes());
        assert!(matches!(parse(&zip64), Err(FormatError::InvalidZip64)));
    }

    #[test]
    fn plain_archive_has_no_zip64_locator() {
        let data = build(&[("a.txt", b"ay")], None);
        let parser = ZipParser::new(ArchiveSource::new(&data).unwrap());
        let eocd_offset = (data.len() - EndOfCentralDirectory::SIZE) as u64;
        assert!(parser.find_zip64_locator(eocd_offset).is_none());
    }

    #[test]
    fn empty_archive_has_no_headers() {
        let data = build(&[], None);
        assert!(parse(&data).unwrap().is_empty());
    }

    #[test]
    fn rejects_buffer_without_eocd() {
        assert!(matches!(
            parse(b"definitely not a zip archive"),
            Err(FormatError::MissingEndOfCentralDirectory)
        ));
        assert!(matches!(
            parse(b"PK"),
            Err(FormatError::MissingEndOfCentralDirectory)
        ));
    }

    #[test]
    fn rejects_overstated_entry_count() {
        let mut data = build(&[("a.txt", b"ay")], None);
        let eocd = data.len() - EndOfCentralDirectory::SIZE;
        data[eocd + 8..eocd + 10].copy_from_slice(&2u16.to_le_bytes());
        data[eocd + 10..eocd + 12].copy_from_slice(&2u16.to_le_bytes());
        assert!(matches!(
            parse(&data),
            Err(FormatError::EntryCountMismatch { declared: 2, found: 1 })
        ));
    }

    #[test]
    fn rejects_directory_outside_buffer() {
        let mut data = build(&[("a.txt", b"ay")], None);
        let eocd = data.len() - EndOfCentralDirectory::SIZE;
        data[eocd + 16..eocd + 20].copy_from_slice(&0x00FF_FFFFu32.to_le_bytes());
        assert!(matches!(
            parse(&data),
            Err(FormatError::CentralDirectoryOutOfBounds { .. })
        ));
    }

    #[test]
    fn rejects_multi_disk() {
        let mut data = build(&[("a.txt", b"ay")], None);
        let eocd = data.len() - EndOfCentralDirectory::SIZE;
        data[eocd + 4..eocd + 6].copy_from_slice(&1u16.to_le_bytes());
        assert!(matches!(parse(&data), Err(FormatError::MultiDisk)));
    }

    #[test]
    fn data_offset_skips_local_header() {
        let data = build(&[("a.txt", b"ay")], None);
        let parser = ZipParser::new(ArchiveSource::new(&data).unwrap());
        let headers = parser.read_central_directory().unwrap();
        let stat = headers[0].stat(0).unwrap();
        let offset = parser.get_data_offset(&stat).unwrap();
        assert_eq!(&data[offset as usize..offset as usize + 2], b"ay");

        let mut mismatched = stat.clone();
        mismatched.compression_method = CompressionMethod::Deflate;
        assert!(matches!(
            parser.get_data_offset(&mismatched),
            Err(EntryError::InvalidLocalHeader)
        ));
    }
}
