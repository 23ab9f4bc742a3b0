#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub type Writer = ZipWriter<Cursor<Vec<u8>>>;

pub const CDFH_FLAGS: usize = 8;
pub const CDFH_METHOD: usize = 10;
pub const CDFH_UNCOMPRESSED_SIZE: usize = 24;
pub const CDFH_LFH_OFFSET: usize = 42;
pub const CDFH_NAME: usize = 46;

pub const LFH_METHOD: usize = 8;
pub const LFH_NAME: usize = 30;

const EOCD_SIZE: usize = 22;

pub fn options(method: CompressionMethod) -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(method)
}

/// Build an archive with a closure that drives the writer.
pub fn build_with(f: impl FnOnce(&mut Writer) -> zip::result::ZipResult<()>) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    f(&mut writer).expect("failed to write fixture");
    writer.finish().expect("failed to finish fixture").into_inner()
}

/// Build an archive of regular files, all with the same method.
pub fn build(files: &[(&str, &[u8])], method: CompressionMethod) -> Vec<u8> {
    build_with(|w| {
        for (name, data) in files {
            w.start_file(*name, options(method))?;
            w.write_all(data)?;
        }
        Ok(())
    })
}

/// Offset of the central directory header for `name`.
pub fn central_header(data: &[u8], name: &str) -> usize {
    (0..data.len().saturating_sub(CDFH_NAME))
        .find(|&i| {
            if &data[i..i + 4] != b"PK\x01\x02" {
                return false;
            }
            let len = u16::from_le_bytes([data[i + 28], data[i + 29]]) as usize;
            data.get(i + CDFH_NAME..i + CDFH_NAME + len) == Some(name.as_bytes())
        })
        .expect("central directory header not found")
}

/// Offset of the local file header for `name`.
pub fn local_header(data: &[u8], name: &str) -> usize {
    (0..data.len().saturating_sub(LFH_NAME))
        .find(|&i| {
            if &data[i..i + 4] != b"PK\x03\x04" {
                return false;
            }
            let len = u16::from_le_bytes([data[i + 26], data[i + 27]]) as usize;
            data.get(i + LFH_NAME..i + LFH_NAME + len) == Some(name.as_bytes())
        })
        .expect("local file header not found")
}

/// Rewrite the end of a comment-less archive so that the directory can only
/// be found through a ZIP64 end record and locator: every size, offset and
/// count in the regular end record becomes a sentinel.
pub fn into_zip64(data: &[u8]) -> Vec<u8> {
    let eocd = data.len() - EOCD_SIZE;
    assert_eq!(&data[eocd..eocd + 4], b"PK\x05\x06");
    let entries = read_u16(data, eocd + 10) as u64;
    let cd_size = read_u32(data, eocd + 12) as u64;
    let cd_offset = read_u32(data, eocd + 16) as u64;

    let mut out = data[..eocd].to_vec();
    let record = out.len() as u64;
    out.extend_from_slice(b"PK\x06\x06");
    out.extend_from_slice(&44u64.to_le_bytes());
    out.extend_from_slice(&45u16.to_le_bytes());
    out.extend_from_slice(&45u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&entries.to_le_bytes());
    out.extend_from_slice(&entries.to_le_bytes());
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());

    out.extend_from_slice(b"PK\x06\x07");
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&record.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());

    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0, 0, 0, 0]);
    out.extend_from_slice(&[0xFF; 12]);
    out.extend_from_slice(&[0, 0]);
    out
}

pub fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

pub fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

pub fn patch_u16(data: &mut [u8], at: usize, value: u16) {
    data[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn patch_u32(data: &mut [u8], at: usize, value: u32) {
    data[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Offset of the first occurrence of `needle`.
pub fn find(data: &[u8], needle: &[u8]) -> usize {
    data.windows(needle.len())
        .position(|w| w == needle)
        .expect("needle not found")
}
