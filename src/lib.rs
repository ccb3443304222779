//! # seekzip: Streaming ZIP Writer
//!
//! `seekzip` writes ZIP archives one entry at a time, accepting each entry's
//! bytes in arbitrary chunks. Data is compressed on the fly through a fixed
//! 16 KiB buffer, and every local file header is patched in place once its
//! entry's size and CRC are known, so the output needs to be seekable but
//! nothing is ever buffered per entry.
//!
//! ## Features
//!
//! - **Streaming Write**: `begin_entry` / `write_data` / `close_entry`, any chunk sizes
//! - **Stored or DEFLATE** per entry, with per-entry level, timestamp and permissions
//! - **Bounded Memory**: compressed output drains through one fixed buffer
//! - **Strict Limits**: no ZIP64; oversize entries, counts and offsets are errors
//!
//! ## Quick Start
//!
//! ```no_run
//! use seekzip::{EntryOptions, StreamingZipWriter};
//!
//! let mut writer = StreamingZipWriter::new("output.zip")?;
//!
//! writer.begin_entry("file1.txt", EntryOptions::deflated())?;
//! writer.write_data(b"Hello, ")?;
//! writer.write_data(b"World!")?;
//! writer.close_entry()?;
//!
//! writer.add_entry("file2.txt", EntryOptions::stored(), b"Another file")?;
//!
//! writer.close()?;
//! # Ok::<(), seekzip::ZipError>(())
//! ```
//!
//! ### Using arbitrary writers
//!
//! ```
//! use seekzip::{EntryOptions, StreamingZipWriter};
//! use std::io::Cursor;
//!
//! let mut writer = StreamingZipWriter::from_writer(Cursor::new(Vec::new()))?;
//! writer.add_entry("data.txt", EntryOptions::default(), b"In-memory ZIP content")?;
//!
//! // finish() closes the archive and returns the writer
//! let zip_bytes = writer.finish()?.into_inner();
//! assert_eq!(&zip_bytes[..4], b"PK\x03\x04");
//! # Ok::<(), seekzip::ZipError>(())
//! ```

pub mod compressor;
pub mod config;
mod entry;
pub mod error;
pub mod format;
pub mod writer;

pub use compressor::{CompressorError, IncrementalCompressor};
pub use config::{EntryOptions, WriterConfig};
pub use error::{Result, ZipError};
pub use format::{CentralDirectoryRecord, CompressionMethod, DosDateTime, EntryKind};
pub use writer::StreamingZipWriter;
