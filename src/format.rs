//! ZIP record layouts and the small pure helpers the writer builds on
//!
//! Everything here is plain encoding: the local file header, the central
//! directory record and the end-of-central-directory trailer, plus MS-DOS
//! timestamps, CRC-32 and Unix permission packing. Nothing in this module
//! knows about entry lifecycles.

use crc32fast::Hasher as Crc32;
use std::io::{self, Write};
use time::{Date, Month, OffsetDateTime};

/// ZIP local file header signature
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;

/// ZIP central directory signature
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x02014b50;

/// ZIP end of central directory signature
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06054b50;

/// Fixed part of a local file header
pub const LOCAL_FILE_HEADER_LEN: u64 = 30;

/// Fixed part of a central directory record
pub const CENTRAL_DIRECTORY_RECORD_LEN: u64 = 46;

/// Fixed part of the end of central directory record
pub const END_OF_CENTRAL_DIRECTORY_LEN: u64 = 22;

/// Permissions applied to file entries when none are given
pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o644;

/// Permissions applied to directory entries when none are given
pub const DEFAULT_DIRECTORY_PERMISSIONS: u32 = 0o755;

/// Version made by: Unix host, spec 2.0
const VERSION_MADE_BY: u16 = (3 << 8) | 20;

/// General purpose flag bit 11: name is UTF-8
const FLAG_UTF8: u16 = 1 << 11;

const S_IFREG: u32 = 0o100000;
const S_IFDIR: u32 = 0o040000;
const MSDOS_DIRECTORY: u32 = 0x10;

/// Compression method to use for ZIP entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMethod {
    /// No compression (stored)
    Stored,
    /// DEFLATE compression (most common)
    #[default]
    Deflate,
}

impl CompressionMethod {
    pub(crate) fn to_zip_method(self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
        }
    }
}

/// Whether an entry describes a regular file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Modification timestamp in MS-DOS (date, time) encoding
///
/// The format covers 1980-01-01 to 2107-12-31 with two-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    date: u16,
    time: u16,
}

impl Default for DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable instant
    fn default() -> Self {
        DosDateTime {
            date: (1 << 5) | 1,
            time: 0,
        }
    }
}

impl DosDateTime {
    /// Build a timestamp from calendar fields
    ///
    /// Returns `None` when the date does not exist or falls outside
    /// 1980..=2107. Odd seconds are rounded down.
    pub fn from_date_and_time(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Option<Self> {
        if !(1980..=2107).contains(&year) || hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        let month = Month::try_from(month).ok()?;
        Date::from_calendar_date(year as i32, month, day).ok()?;

        let date = (day as u16) | ((u8::from(month) as u16) << 5) | ((year - 1980) << 9);
        let time = ((second as u16) >> 1) | ((minute as u16) << 5) | ((hour as u16) << 11);
        Some(DosDateTime { date, time })
    }

    /// Wrap an already-encoded (date, time) pair
    pub const fn from_msdos(date: u16, time: u16) -> Self {
        DosDateTime { date, time }
    }

    /// Current wall clock time in UTC
    pub fn now() -> Self {
        Self::from(OffsetDateTime::now_utc())
    }

    pub const fn date(&self) -> u16 {
        self.date
    }

    pub const fn time(&self) -> u16 {
        self.time
    }
}

impl From<OffsetDateTime> for DosDateTime {
    /// Out-of-range instants clamp to the 1980 epoch
    fn from(dt: OffsetDateTime) -> Self {
        let year = dt.year();
        if !(1980..=2107).contains(&year) {
            return DosDateTime::default();
        }
        DosDateTime::from_date_and_time(
            year as u16,
            u8::from(dt.month()),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
        .unwrap_or_default()
    }
}

/// Continue a CRC-32 over `bytes` starting from `prior`
///
/// `crc32(crc32(0, a), b) == crc32(0, a ++ b)`
pub fn crc32(prior: u32, bytes: &[u8]) -> u32 {
    let mut hasher = Crc32::new_with_initial(prior);
    hasher.update(bytes);
    hasher.finalize()
}

/// Pack Unix mode bits into the central directory's external attributes
pub fn external_attributes(kind: EntryKind, permissions: u32) -> u32 {
    let permissions = permissions & 0o7777;
    match kind {
        EntryKind::File => (S_IFREG | permissions) << 16,
        EntryKind::Directory => ((S_IFDIR | permissions) << 16) | MSDOS_DIRECTORY,
    }
}

/// Local file header as written in front of every entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub method: CompressionMethod,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: Vec<u8>,
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    /// Header with zeroed sizes and checksum
    pub fn new(
        name: &str,
        kind: EntryKind,
        method: CompressionMethod,
        modified: DosDateTime,
    ) -> Self {
        let version_needed = match (kind, method) {
            (EntryKind::File, CompressionMethod::Stored) => 10,
            _ => 20,
        };
        let flags = if name.is_ascii() { 0 } else { FLAG_UTF8 };
        LocalFileHeader {
            version_needed,
            flags,
            method,
            modified,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            name: name.as_bytes().to_vec(),
            extra: Vec::new(),
        }
    }

    /// Same header with final checksum and sizes filled in
    pub fn with_sizes(mut self, crc32: u32, compressed_size: u32, uncompressed_size: u32) -> Self {
        self.crc32 = crc32;
        self.compressed_size = compressed_size;
        self.uncompressed_size = uncompressed_size;
        self
    }

    pub fn encoded_len(&self) -> u64 {
        LOCAL_FILE_HEADER_LEN + self.name.len() as u64 + self.extra.len() as u64
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len() as usize);
        buf.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&self.version_needed.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&self.method.to_zip_method().to_le_bytes());
        buf.extend_from_slice(&self.modified.time().to_le_bytes());
        buf.extend_from_slice(&self.modified.date().to_le_bytes());
        buf.extend_from_slice(&self.crc32.to_le_bytes());
        buf.extend_from_slice(&self.compressed_size.to_le_bytes());
        buf.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        buf.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(self.extra.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.name);
        buf.extend_from_slice(&self.extra);
        buf
    }

    /// Encode and write at the sink's current position
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.encode())
    }
}

/// Central directory record for one finalized entry
///
/// Built once when an entry closes and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryRecord {
    header: LocalFileHeader,
    external_attributes: u32,
    relative_offset: u32,
    comment: Vec<u8>,
}

impl CentralDirectoryRecord {
    pub fn new(header: LocalFileHeader, external_attributes: u32, relative_offset: u32) -> Self {
        CentralDirectoryRecord {
            header,
            external_attributes,
            relative_offset,
            comment: Vec::new(),
        }
    }

    /// Entry name as stored (lossy for non UTF-8 bytes)
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.header.name).into_owned()
    }

    pub fn method(&self) -> CompressionMethod {
        self.header.method
    }

    pub fn crc32(&self) -> u32 {
        self.header.crc32
    }

    pub fn compressed_size(&self) -> u32 {
        self.header.compressed_size
    }

    pub fn uncompressed_size(&self) -> u32 {
        self.header.uncompressed_size
    }

    pub fn modified(&self) -> DosDateTime {
        self.header.modified
    }

    pub fn external_attributes(&self) -> u32 {
        self.external_attributes
    }

    /// Unix permission bits recovered from the external attributes
    pub fn permissions(&self) -> u32 {
        (self.external_attributes >> 16) & 0o7777
    }

    pub fn is_dir(&self) -> bool {
        self.external_attributes & MSDOS_DIRECTORY != 0
    }

    /// Offset of the entry's local file header
    pub fn relative_offset(&self) -> u32 {
        self.relative_offset
    }

    pub fn name_len(&self) -> u16 {
        self.header.name.len() as u16
    }

    pub fn extra_len(&self) -> u16 {
        self.header.extra.len() as u16
    }

    pub fn comment_len(&self) -> u16 {
        self.comment.len() as u16
    }

    pub fn encoded_len(&self) -> u64 {
        CENTRAL_DIRECTORY_RECORD_LEN
            + self.name_len() as u64
            + self.extra_len() as u64
            + self.comment_len() as u64
    }

    pub fn encode(&self) -> Vec<u8> {
        let h = &self.header;
        let mut buf = Vec::with_capacity(self.encoded_len() as usize);
        buf.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&VERSION_MADE_BY.to_le_bytes());
        buf.extend_from_slice(&h.version_needed.to_le_bytes());
        buf.extend_from_slice(&h.flags.to_le_bytes());
        buf.extend_from_slice(&h.method.to_zip_method().to_le_bytes());
        buf.extend_from_slice(&h.modified.time().to_le_bytes());
        buf.extend_from_slice(&h.modified.date().to_le_bytes());
        buf.extend_from_slice(&h.crc32.to_le_bytes());
        buf.extend_from_slice(&h.compressed_size.to_le_bytes());
        buf.extend_from_slice(&h.uncompressed_size.to_le_bytes());
        buf.extend_from_slice(&self.name_len().to_le_bytes());
        buf.extend_from_slice(&self.extra_len().to_le_bytes());
        buf.extend_from_slice(&self.comment_len().to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes()); // disk number start
        buf.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        buf.extend_from_slice(&self.external_attributes.to_le_bytes());
        buf.extend_from_slice(&self.relative_offset.to_le_bytes());
        buf.extend_from_slice(&h.name);
        buf.extend_from_slice(&h.extra);
        buf.extend_from_slice(&self.comment);
        buf
    }
}

/// End of central directory record (single-volume only)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndOfCentralDirectoryRecord {
    pub entries_on_disk: u16,
    pub entries_total: u16,
    pub central_directory_size: u32,
    pub central_directory_offset: u32,
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectoryRecord {
    /// Copy `template` (its comment) with fresh counts and location
    pub fn from_template(
        template: &EndOfCentralDirectoryRecord,
        entries_on_disk: u16,
        entries_total: u16,
        central_directory_size: u32,
        central_directory_offset: u32,
    ) -> Self {
        EndOfCentralDirectoryRecord {
            entries_on_disk,
            entries_total,
            central_directory_size,
            central_directory_offset,
            comment: template.comment.clone(),
        }
    }

    pub fn encoded_len(&self) -> u64 {
        END_OF_CENTRAL_DIRECTORY_LEN + self.comment.len() as u64
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len() as usize);
        buf.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes()); // disk number
        buf.extend_from_slice(&0u16.to_le_bytes()); // disk with central dir
        buf.extend_from_slice(&self.entries_on_disk.to_le_bytes());
        buf.extend_from_slice(&self.entries_total.to_le_bytes());
        buf.extend_from_slice(&self.central_directory_size.to_le_bytes());
        buf.extend_from_slice(&self.central_directory_offset.to_le_bytes());
        buf.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.comment);
        buf
    }
}
