//! Per-entry byte sinks
//!
//! An [`EntryStream`] tracks sizes and the running CRC of one entry and
//! pushes its bytes to the archive output, either verbatim or through an
//! [`IncrementalCompressor`].

use crate::compressor::{CompressorError, IncrementalCompressor};
use crate::error::{Result, ZipError};
use crate::format::{crc32, CompressionMethod};
use std::io::Write;

/// Metadata tracker for CRC and byte counts
#[derive(Debug, Default)]
struct CrcCounter {
    crc: u32,
    uncompressed_count: u64,
    compressed_count: u64,
}

impl CrcCounter {
    fn update_uncompressed(&mut self, data: &[u8]) {
        self.crc = crc32(self.crc, data);
        self.uncompressed_count += data.len() as u64;
    }

    fn add_compressed(&mut self, count: u64) {
        self.compressed_count += count;
    }
}

pub(crate) struct StoredEntryStream {
    counter: CrcCounter,
}

pub(crate) struct DeflatedEntryStream {
    counter: CrcCounter,
    compressor: IncrementalCompressor,
}

/// Sink for the data of the entry currently being written
pub(crate) enum EntryStream {
    Stored(StoredEntryStream),
    Deflated(DeflatedEntryStream),
}

/// Collapse codec failures into one error kind; sink I/O errors pass through
fn codec_error(err: CompressorError) -> ZipError {
    match err {
        CompressorError::Sink(e) => ZipError::Io(e),
        CompressorError::Init(msg) => ZipError::CompressionInit(msg),
        other => ZipError::Compression(other.to_string()),
    }
}

impl EntryStream {
    pub(crate) fn new(
        method: CompressionMethod,
        compression_level: u32,
        buffer_capacity: usize,
    ) -> Result<Self> {
        Ok(match method {
            CompressionMethod::Stored => EntryStream::Stored(StoredEntryStream {
                counter: CrcCounter::default(),
            }),
            CompressionMethod::Deflate => EntryStream::Deflated(DeflatedEntryStream {
                counter: CrcCounter::default(),
                compressor: IncrementalCompressor::new(compression_level, buffer_capacity)
                    .map_err(codec_error)?,
            }),
        })
    }

    pub(crate) fn write<W: Write>(&mut self, out: &mut W, data: &[u8]) -> Result<()> {
        match self {
            EntryStream::Stored(stream) => {
                out.write_all(data)?;
                stream.counter.update_uncompressed(data);
                stream.counter.add_compressed(data.len() as u64);
                Ok(())
            }
            EntryStream::Deflated(stream) => {
                stream.counter.update_uncompressed(data);
                let counter = &mut stream.counter;
                stream
                    .compressor
                    .process(data, |chunk| {
                        out.write_all(chunk)?;
                        counter.add_compressed(chunk.len() as u64);
                        Ok(())
                    })
                    .map_err(codec_error)
            }
        }
    }

    /// Flush whatever the codec still holds
    pub(crate) fn close<W: Write>(&mut self, out: &mut W) -> Result<()> {
        match self {
            EntryStream::Stored(_) => Ok(()),
            EntryStream::Deflated(stream) => {
                let counter = &mut stream.counter;
                stream
                    .compressor
                    .finalize(|chunk| {
                        out.write_all(chunk)?;
                        counter.add_compressed(chunk.len() as u64);
                        Ok(())
                    })
                    .map_err(codec_error)
            }
        }
    }

    /// Stream whose counters already hold the given sizes
    #[cfg(test)]
    pub(crate) fn with_counts(
        method: CompressionMethod,
        uncompressed: u64,
        compressed: u64,
    ) -> Self {
        let counter = CrcCounter {
            crc: 0,
            uncompressed_count: uncompressed,
            compressed_count: compressed,
        };
        match method {
            CompressionMethod::Stored => EntryStream::Stored(StoredEntryStream { counter }),
            CompressionMethod::Deflate => EntryStream::Deflated(DeflatedEntryStream {
                counter,
                compressor: IncrementalCompressor::new(6, 1024).unwrap(),
            }),
        }
    }

    fn counter(&self) -> &CrcCounter {
        match self {
            EntryStream::Stored(stream) => &stream.counter,
            EntryStream::Deflated(stream) => &stream.counter,
        }
    }

    pub(crate) fn uncompressed_size(&self) -> u64 {
        self.counter().uncompressed_count
    }

    pub(crate) fn compressed_size(&self) -> u64 {
        self.counter().compressed_count
    }

    pub(crate) fn checksum(&self) -> u32 {
        self.counter().crc
    }
}
