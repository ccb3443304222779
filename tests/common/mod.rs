//! Minimal ZIP reader used to verify what the writer produced
//!
//! Reads the whole archive into memory, walks the central directory and
//! decodes entries through their local file headers.

#![allow(dead_code)]

use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::Path;

const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;
const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x02014b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06054b50;

/// Entry in the ZIP central directory
#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: String,
    pub compression_method: u16,
    pub flags: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub external_attributes: u32,
    pub offset: u32,
}

/// Fields of a local file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeader {
    pub compression_method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: String,
    pub data_offset: usize,
}

/// Trailer fields
#[derive(Debug, Clone)]
pub struct Trailer {
    pub entries_on_disk: u16,
    pub entries_total: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment: Vec<u8>,
}

pub struct ArchiveReader {
    data: Vec<u8>,
    entries: Vec<ZipEntry>,
    trailer: Trailer,
}

fn u16_at(buf: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([buf[pos], buf[pos + 1]])
}

fn u32_at(buf: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

impl ArchiveReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::from_bytes(std::fs::read(path).expect("read archive"))
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        let eocd = Self::find_eocd(&data);
        let comment_len = u16_at(&data, eocd + 20) as usize;
        let trailer = Trailer {
            entries_on_disk: u16_at(&data, eocd + 8),
            entries_total: u16_at(&data, eocd + 10),
            cd_size: u32_at(&data, eocd + 12),
            cd_offset: u32_at(&data, eocd + 16),
            comment: data[eocd + 22..eocd + 22 + comment_len].to_vec(),
        };
        assert_eq!(
            trailer.cd_offset as usize + trailer.cd_size as usize,
            eocd,
            "central directory must end where the trailer starts"
        );

        let mut entries = Vec::with_capacity(trailer.entries_total as usize);
        let mut pos = trailer.cd_offset as usize;
        for _ in 0..trailer.entries_total {
            assert_eq!(u32_at(&data, pos), CENTRAL_DIRECTORY_SIGNATURE);
            let name_len = u16_at(&data, pos + 28) as usize;
            let extra_len = u16_at(&data, pos + 30) as usize;
            let comment_len = u16_at(&data, pos + 32) as usize;
            entries.push(ZipEntry {
                name: String::from_utf8_lossy(&data[pos + 46..pos + 46 + name_len]).into_owned(),
                flags: u16_at(&data, pos + 8),
                compression_method: u16_at(&data, pos + 10),
                mod_time: u16_at(&data, pos + 12),
                mod_date: u16_at(&data, pos + 14),
                crc32: u32_at(&data, pos + 16),
                compressed_size: u32_at(&data, pos + 20),
                uncompressed_size: u32_at(&data, pos + 24),
                external_attributes: u32_at(&data, pos + 38),
                offset: u32_at(&data, pos + 42),
            });
            pos += 46 + name_len + extra_len + comment_len;
        }
        assert_eq!(pos, eocd);

        ArchiveReader {
            data,
            entries,
            trailer,
        }
    }

    fn find_eocd(data: &[u8]) -> usize {
        let min = data.len().saturating_sub(22 + u16::MAX as usize);
        (min..=data.len() - 22)
            .rev()
            .find(|&pos| u32_at(data, pos) == END_OF_CENTRAL_DIRECTORY_SIGNATURE)
            .expect("end of central directory not found")
    }

    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    pub fn find_entry(&self, name: &str) -> Option<&ZipEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn local_header(&self, entry: &ZipEntry) -> LocalHeader {
        let pos = entry.offset as usize;
        assert_eq!(u32_at(&self.data, pos), LOCAL_FILE_HEADER_SIGNATURE);
        let name_len = u16_at(&self.data, pos + 26) as usize;
        let extra_len = u16_at(&self.data, pos + 28) as usize;
        LocalHeader {
            compression_method: u16_at(&self.data, pos + 8),
            crc32: u32_at(&self.data, pos + 14),
            compressed_size: u32_at(&self.data, pos + 18),
            uncompressed_size: u32_at(&self.data, pos + 22),
            name: String::from_utf8_lossy(&self.data[pos + 30..pos + 30 + name_len]).into_owned(),
            data_offset: pos + 30 + name_len + extra_len,
        }
    }

    /// Raw bytes as stored in the archive
    pub fn raw_data(&self, entry: &ZipEntry) -> &[u8] {
        let header = self.local_header(entry);
        &self.data[header.data_offset..header.data_offset + entry.compressed_size as usize]
    }

    /// Decompressed entry contents, with the CRC checked
    pub fn read_entry(&self, entry: &ZipEntry) -> Vec<u8> {
        let raw = self.raw_data(entry);
        let data = match entry.compression_method {
            0 => raw.to_vec(),
            8 => {
                let mut out = Vec::new();
                DeflateDecoder::new(raw).read_to_end(&mut out).unwrap();
                out
            }
            other => panic!("unsupported compression method {}", other),
        };
        let mut crc = crc32fast::Hasher::new();
        crc.update(&data);
        assert_eq!(crc.finalize(), entry.crc32, "crc mismatch for {}", entry.name);
        assert_eq!(data.len() as u32, entry.uncompressed_size);
        data
    }

    pub fn read_entry_by_name(&self, name: &str) -> Vec<u8> {
        let entry = self
            .find_entry(name)
            .unwrap_or_else(|| panic!("entry {} not found", name))
            .clone();
        self.read_entry(&entry)
    }
}
