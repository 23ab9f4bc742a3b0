use flate2::CrcReader;
use flate2::read::DeflateDecoder;
use std::io::{self, Read};

use crate::error::EntryError;

use super::structures::{CompressionMethod, EntryStat};

enum Decoder<'a> {
    Stored(&'a [u8]),
    Deflate(DeflateDecoder<&'a [u8]>),
}

impl Read for Decoder<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Decoder::Stored(data) => data.read(buf),
            Decoder::Deflate(decoder) => decoder.read(buf),
        }
    }
}

/// Reader over one entry's decompressed content.
///
/// Reads straight out of the archive buffer and tracks the CRC-32 of
/// everything it yields.
pub struct EntryReader<'a> {
    inner: CrcReader<Decoder<'a>>,
    expected_size: u64,
    expected_crc: u32,
}

impl<'a> EntryReader<'a> {
    /// Wrap the raw entry `data` for the entry described by `stat`.
    pub fn new(stat: &EntryStat, data: &'a [u8]) -> Result<Self, EntryError> {
        let decoder = match stat.compression_method {
            CompressionMethod::Stored => Decoder::Stored(data),
            CompressionMethod::Deflate => Decoder::Deflate(DeflateDecoder::new(data)),
            CompressionMethod::Unknown(method) => {
                return Err(EntryError::UnsupportedCompression(method));
            }
        };

        Ok(Self {
            inner: CrcReader::new(decoder),
            expected_size: stat.uncompressed_size,
            expected_crc: stat.crc32,
        })
    }

    /// Declared uncompressed size.
    pub fn size(&self) -> u64 {
        self.expected_size
    }

    /// Read exactly the declared number of bytes and verify their CRC-32.
    ///
    /// Fewer bytes than declared is a [`EntryError::ShortRead`]; the partial
    /// content is dropped.
    pub fn read_to_vec(mut self) -> Result<Vec<u8>, EntryError> {
        let size = self.expected_size;
        let capacity = usize::try_from(size).map_err(|_| EntryError::Allocation(size))?;

        let mut content = Vec::new();
        content
            .try_reserve_exact(capacity)
            .map_err(|_| EntryError::Allocation(size))?;

        (&mut self.inner).take(size).read_to_end(&mut content)?;

        if content.len() as u64 != size {
            return Err(EntryError::ShortRead {
                expected: size,
                actual: content.len() as u64,
            });
        }

        let actual = self.inner.crc().sum();
        if actual != self.expected_crc {
            return Err(EntryError::ChecksumMismatch {
                expected: self.expected_crc,
                actual,
            });
        }

        Ok(content)
    }
}

impl Read for EntryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
