//! Error types for seekzip

use std::io;

/// Result type for seekzip operations
pub type Result<T> = std::result::Result<T, ZipError>;

/// Error types that can occur while writing a ZIP archive
#[derive(Debug)]
pub enum ZipError {
    /// I/O error from the underlying sink
    Io(io::Error),
    /// Operation attempted after the archive was closed
    ArchiveClosed,
    /// `write_data`/`close_entry` called with no open entry
    NoCurrentEntry,
    /// `close` called while an entry is still open
    UnclosedEntry,
    /// A header patch failed; the archive can no longer be completed
    ArchivePoisoned,
    /// A field does not fit the classic (non-ZIP64) record layout
    Requires64BitFormat {
        /// Which field overflowed
        field: &'static str,
        /// The value that did not fit
        value: u64,
    },
    /// A header or the central directory would start at or past `u32::MAX`
    CentralDirectoryOffsetOverflow(u64),
    /// The compression codec could not be constructed
    CompressionInit(String),
    /// The compression codec failed while processing data
    Compression(String),
    /// Entry name cannot be encoded in a ZIP record
    InvalidEntryName(String),
    /// Archive comment longer than a ZIP record can hold
    CommentTooLong(usize),
}

impl std::fmt::Display for ZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZipError::Io(e) => write!(f, "I/O error: {}", e),
            ZipError::ArchiveClosed => write!(f, "Archive is already closed"),
            ZipError::NoCurrentEntry => write!(f, "No entry is open"),
            ZipError::UnclosedEntry => {
                write!(f, "An entry is still open; call close_entry() first")
            }
            ZipError::ArchivePoisoned => write!(
                f,
                "A local header could not be rewritten; the archive is unusable"
            ),
            ZipError::Requires64BitFormat { field, value } => write!(
                f,
                "{} of {} requires the ZIP64 format, which is not supported",
                field, value
            ),
            ZipError::CentralDirectoryOffsetOverflow(offset) => write!(
                f,
                "Offset {} does not fit in a 32-bit ZIP field",
                offset
            ),
            ZipError::CompressionInit(msg) => {
                write!(f, "Failed to initialize compressor: {}", msg)
            }
            ZipError::Compression(msg) => write!(f, "Compression error: {}", msg),
            ZipError::InvalidEntryName(name) => write!(f, "Invalid entry name: {}", name),
            ZipError::CommentTooLong(len) => {
                write!(f, "Archive comment of {} bytes is too long", len)
            }
        }
    }
}

impl std::error::Error for ZipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZipError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ZipError {
    fn from(err: io::Error) -> Self {
        ZipError::Io(err)
    }
}

impl From<ZipError> for io::Error {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
