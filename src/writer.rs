//! Streaming ZIP writer that patches local headers in place
//!
//! Each entry gets a provisional local file header with zero sizes and CRC.
//! Once the entry closes, the writer seeks back, rewrites that header with
//! the real values and returns to the end of the data. No data descriptors,
//! no temp files, and no entry is ever held in memory as a whole.
//!
//! Works with any sink that implements `Write + Seek` (File, Cursor<Vec<u8>>, ...).

use crate::config::{EntryOptions, WriterConfig};
use crate::entry::EntryStream;
use crate::error::{Result, ZipError};
use crate::format::{
    external_attributes, CentralDirectoryRecord, CompressionMethod, DosDateTime,
    EndOfCentralDirectoryRecord, EntryKind, LocalFileHeader, DEFAULT_DIRECTORY_PERMISSIONS,
    DEFAULT_FILE_PERMISSIONS,
};
use log::debug;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

/// Entry being written to ZIP
struct CurrentEntry {
    name: String,
    kind: EntryKind,
    method: CompressionMethod,
    modified: DosDateTime,
    permissions: u32,
    local_header_offset: u64,
    stream: EntryStream,
}

/// Streaming ZIP writer that compresses data on-the-fly
pub struct StreamingZipWriter<W: Write + Seek> {
    output: W,
    config: WriterConfig,
    entries: Vec<CentralDirectoryRecord>,
    current_entry: Option<CurrentEntry>,
    trailer: EndOfCentralDirectoryRecord,
    closed: bool,
    poisoned: bool,
}

impl StreamingZipWriter<File> {
    /// Create the file at `path` and write a ZIP archive into it
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(path, WriterConfig::default())
    }

    /// Like [`new`](Self::new) with explicit settings
    pub fn with_config<P: AsRef<Path>>(path: P, config: WriterConfig) -> Result<Self> {
        let output = File::create(path)?;
        Self::from_writer_with_config(output, config)
    }
}

impl<W: Write + Seek> StreamingZipWriter<W> {
    /// Create a new ZIP writer from an arbitrary writer
    ///
    /// The archive starts at the writer's current position.
    pub fn from_writer(writer: W) -> Result<Self> {
        Self::from_writer_with_config(writer, WriterConfig::default())
    }

    /// Create a new ZIP writer from an arbitrary writer with explicit settings
    pub fn from_writer_with_config(writer: W, config: WriterConfig) -> Result<Self> {
        Ok(Self {
            output: writer,
            config,
            entries: Vec::new(),
            current_entry: None,
            trailer: EndOfCentralDirectoryRecord::default(),
            closed: false,
            poisoned: false,
        })
    }

    /// Set the archive comment written into the trailer
    pub fn set_comment(&mut self, comment: impl Into<Vec<u8>>) -> Result<()> {
        if self.closed {
            return Err(ZipError::ArchiveClosed);
        }
        let comment = comment.into();
        if comment.len() > u16::MAX as usize {
            return Err(ZipError::CommentTooLong(comment.len()));
        }
        self.trailer.comment = comment;
        Ok(())
    }

    /// Central directory records of every entry closed so far, in write order
    pub fn entries(&self) -> &[CentralDirectoryRecord] {
        &self.entries
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn has_open_entry(&self) -> bool {
        self.current_entry.is_some()
    }

    /// Borrow the underlying sink
    pub fn get_ref(&self) -> &W {
        &self.output
    }

    /// Start a new entry (file) in the ZIP
    ///
    /// An entry that is still open is closed first. Names must be non-empty
    /// and at most `u16::MAX` bytes long.
    pub fn begin_entry(&mut self, name: &str, options: EntryOptions) -> Result<()> {
        self.begin(name, EntryKind::File, options)
    }

    /// Add an empty directory entry; a trailing `/` is appended if missing
    pub fn add_directory(&mut self, name: &str, options: EntryOptions) -> Result<()> {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{}/", name)
        };
        let options = EntryOptions {
            method: CompressionMethod::Stored,
            ..options
        };
        self.begin(&name, EntryKind::Directory, options)?;
        self.close_entry()
    }

    /// Write a whole entry in one call
    pub fn add_entry(&mut self, name: &str, options: EntryOptions, data: &[u8]) -> Result<()> {
        self.begin_entry(name, options)?;
        self.write_data(data)?;
        self.close_entry()
    }

    fn begin(&mut self, name: &str, kind: EntryKind, options: EntryOptions) -> Result<()> {
        if self.closed {
            return Err(ZipError::ArchiveClosed);
        }
        if self.poisoned {
            return Err(ZipError::ArchivePoisoned);
        }
        self.close_entry_if_open()?;

        if name.is_empty() {
            return Err(ZipError::InvalidEntryName("name is empty".to_string()));
        }
        if name.len() > u16::MAX as usize {
            return Err(ZipError::InvalidEntryName(format!(
                "name of {} bytes exceeds {} bytes",
                name.len(),
                u16::MAX
            )));
        }

        // Build the sink first so a codec failure leaves nothing behind
        let level = options
            .compression_level
            .unwrap_or(self.config.compression_level);
        let stream = EntryStream::new(options.method, level, self.config.buffer_capacity)?;

        let modified = options.modified.unwrap_or_else(DosDateTime::now);
        let permissions = options.permissions.unwrap_or(match kind {
            EntryKind::File => DEFAULT_FILE_PERMISSIONS,
            EntryKind::Directory => DEFAULT_DIRECTORY_PERMISSIONS,
        });

        let local_header_offset = self.output.stream_position()?;
        LocalFileHeader::new(name, kind, options.method, modified).write_to(&mut self.output)?;

        debug!(
            "begin entry {:?} ({:?}) at offset {}",
            name, options.method, local_header_offset
        );

        self.current_entry = Some(CurrentEntry {
            name: name.to_string(),
            kind,
            method: options.method,
            modified,
            permissions,
            local_header_offset,
            stream,
        });
        Ok(())
    }

    /// Write uncompressed data to the current entry
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        if self.poisoned {
            return Err(ZipError::ArchivePoisoned);
        }
        let entry = self
            .current_entry
            .as_mut()
            .ok_or(ZipError::NoCurrentEntry)?;
        entry.stream.write(&mut self.output, data)
    }

    /// Finish the current entry: flush the codec, patch its header and
    /// record it for the central directory
    ///
    /// On failure the entry is dropped without a central directory record.
    /// If the header rewrite itself fails the writer is poisoned: every
    /// later `begin_entry`, `write_data` and `close` returns
    /// [`ZipError::ArchivePoisoned`].
    pub fn close_entry(&mut self) -> Result<()> {
        let mut entry = self.current_entry.take().ok_or(ZipError::NoCurrentEntry)?;
        entry.stream.close(&mut self.output)?;

        let uncompressed_size = fit_u32("uncompressed size", entry.stream.uncompressed_size())?;
        let compressed_size = fit_u32("compressed size", entry.stream.compressed_size())?;
        let relative_offset = fit_offset(entry.local_header_offset)?;

        let header = LocalFileHeader::new(&entry.name, entry.kind, entry.method, entry.modified)
            .with_sizes(entry.stream.checksum(), compressed_size, uncompressed_size);

        let end_of_data = self.output.stream_position()?;
        if let Err(err) = self.patch_header(&header, entry.local_header_offset, end_of_data) {
            self.poisoned = true;
            // leave the cursor past the entry even though the archive is lost
            let _ = self.output.seek(SeekFrom::Start(end_of_data));
            return Err(err.into());
        }

        debug!(
            "closed entry {:?}: {} -> {} bytes, crc {:08x}",
            entry.name,
            uncompressed_size,
            compressed_size,
            header.crc32
        );

        let attributes = external_attributes(entry.kind, entry.permissions);
        self.entries
            .push(CentralDirectoryRecord::new(header, attributes, relative_offset));
        Ok(())
    }

    fn patch_header(
        &mut self,
        header: &LocalFileHeader,
        header_offset: u64,
        end_of_data: u64,
    ) -> io::Result<()> {
        self.output.seek(SeekFrom::Start(header_offset))?;
        header.write_to(&mut self.output)?;
        self.output.seek(SeekFrom::Start(end_of_data))?;
        Ok(())
    }

    fn close_entry_if_open(&mut self) -> Result<()> {
        if self.current_entry.is_some() {
            self.close_entry()?;
        }
        Ok(())
    }

    /// Write the central directory and trailer
    ///
    /// Calling this again after it succeeded does nothing. Fails with
    /// [`ZipError::UnclosedEntry`] while an entry is open.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.poisoned {
            return Err(ZipError::ArchivePoisoned);
        }
        if self.current_entry.is_some() {
            return Err(ZipError::UnclosedEntry);
        }

        if self.entries.len() >= u16::MAX as usize {
            return Err(ZipError::Requires64BitFormat {
                field: "entry count",
                value: self.entries.len() as u64,
            });
        }
        let entry_count = self.entries.len() as u16;
        let central_dir_offset = fit_offset(self.output.stream_position()?)?;
        let central_dir_size = fit_u32(
            "central directory size",
            self.entries.iter().map(|e| e.encoded_len()).sum(),
        )?;

        for entry in &self.entries {
            self.output.write_all(&entry.encode())?;
        }

        let trailer = EndOfCentralDirectoryRecord::from_template(
            &self.trailer,
            entry_count,
            entry_count,
            central_dir_size,
            central_dir_offset,
        );
        self.output.write_all(&trailer.encode())?;
        self.output.flush()?;
        self.closed = true;

        debug!(
            "closed archive: {} entries, central directory {} bytes at {}",
            entry_count, central_dir_size, central_dir_offset
        );
        Ok(())
    }

    /// Close the archive and hand back the sink
    pub fn finish(mut self) -> Result<W> {
        self.close()?;
        Ok(self.output)
    }
}

impl<W: Write + Seek> Write for StreamingZipWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_data(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

// All-ones values are ZIP64 markers to readers, so they count as overflow too.
fn fit_u32(field: &'static str, value: u64) -> Result<u32> {
    if value >= u32::MAX as u64 {
        return Err(ZipError::Requires64BitFormat { field, value });
    }
    Ok(value as u32)
}

fn fit_offset(offset: u64) -> Result<u32> {
    if offset >= u32::MAX as u64 {
        return Err(ZipError::CentralDirectoryOffsetOverflow(offset));
    }
    Ok(offset as u32)
}
