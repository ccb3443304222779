//! Incremental DEFLATE compressor with a fixed-size output buffer
//!
//! Input arrives in arbitrary chunks; compressed bytes leave through a
//! caller-supplied consumer, one full buffer at a time. Memory use is the
//! codec state plus one buffer regardless of how much data passes through.

use flate2::{Compress, Compression, FlushCompress, Status};
use log::trace;
use std::io;

/// Errors raised by [`IncrementalCompressor`]
#[derive(Debug)]
pub enum CompressorError {
    /// The codec could not be set up
    Init(String),
    /// The codec reported an internal failure
    Process(String),
    /// `process` called after `finalize`
    Finished,
    /// The consumer failed to accept a chunk
    Sink(io::Error),
}

impl std::fmt::Display for CompressorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressorError::Init(msg) => write!(f, "compressor init failed: {}", msg),
            CompressorError::Process(msg) => write!(f, "compressor failed: {}", msg),
            CompressorError::Finished => write!(f, "compressor already finalized"),
            CompressorError::Sink(e) => write!(f, "compressed output rejected: {}", e),
        }
    }
}

impl std::error::Error for CompressorError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Active,
    Finished,
}

/// Raw DEFLATE stream fed chunk by chunk
pub struct IncrementalCompressor {
    codec: Compress,
    buffer: Vec<u8>,
    filled: usize,
    state: State,
}

impl IncrementalCompressor {
    /// Create a compressor at `level` (0-9) draining through `buffer_capacity` bytes
    pub fn new(level: u32, buffer_capacity: usize) -> Result<Self, CompressorError> {
        if level > 9 {
            return Err(CompressorError::Init(format!(
                "compression level {} is outside 0-9",
                level
            )));
        }
        if buffer_capacity == 0 {
            return Err(CompressorError::Init(
                "output buffer capacity must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            // raw deflate: ZIP entries carry no zlib header
            codec: Compress::new(Compression::new(level), false),
            buffer: vec![0u8; buffer_capacity],
            filled: 0,
            state: State::Active,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Feed `input` to the codec, handing every full output buffer to `consumer`
    ///
    /// Bytes that do not fill a buffer stay pending until a later call or
    /// [`finalize`](Self::finalize).
    pub fn process<F>(&mut self, input: &[u8], mut consumer: F) -> Result<(), CompressorError>
    where
        F: FnMut(&[u8]) -> io::Result<()>,
    {
        if self.is_finished() {
            return Err(CompressorError::Finished);
        }
        self.drain(input, false, &mut consumer)
    }

    /// Flush all codec state, delivering the remainder to `consumer`
    ///
    /// No-op once finished.
    pub fn finalize<F>(&mut self, mut consumer: F) -> Result<(), CompressorError>
    where
        F: FnMut(&[u8]) -> io::Result<()>,
    {
        if self.is_finished() {
            return Ok(());
        }
        self.drain(&[], true, &mut consumer)?;

        if self.filled > 0 {
            trace!("compressor: final chunk of {} bytes", self.filled);
            consumer(&self.buffer[..self.filled]).map_err(CompressorError::Sink)?;
            self.filled = 0;
        }
        self.state = State::Finished;
        Ok(())
    }

    fn drain<F>(
        &mut self,
        mut input: &[u8],
        finishing: bool,
        consumer: &mut F,
    ) -> Result<(), CompressorError>
    where
        F: FnMut(&[u8]) -> io::Result<()>,
    {
        let flush = if finishing {
            FlushCompress::Finish
        } else {
            FlushCompress::None
        };

        loop {
            if self.filled == self.buffer.len() {
                trace!("compressor: draining {} bytes", self.filled);
                consumer(&self.buffer).map_err(CompressorError::Sink)?;
                self.filled = 0;
            }

            let before_in = self.codec.total_in();
            let before_out = self.codec.total_out();
            let status = self
                .codec
                .compress(input, &mut self.buffer[self.filled..], flush)
                .map_err(|e| CompressorError::Process(e.to_string()))?;
            let consumed = (self.codec.total_in() - before_in) as usize;
            let produced = (self.codec.total_out() - before_out) as usize;

            input = &input[consumed..];
            self.filled += produced;
            let full = self.filled == self.buffer.len();

            match status {
                Status::StreamEnd => return Ok(()),
                Status::Ok | Status::BufError => {
                    // A full buffer may hide more pending output, so only an
                    // unfilled one proves the codec wants more input.
                    if !finishing && input.is_empty() && !full {
                        return Ok(());
                    }
                    if consumed == 0 && produced == 0 && !full {
                        return Err(CompressorError::Process(
                            "codec made no progress".to_string(),
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        DeflateDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    fn pseudo_random(size: usize) -> Vec<u8> {
        let mut state = 0x12345678u32;
        (0..size)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                (state >> 16) as u8
            })
            .collect()
    }

    #[test]
    fn test_chunks_are_bounded_by_buffer() {
        let input = pseudo_random(50_000);
        let mut compressor = IncrementalCompressor::new(6, 64).unwrap();
        let mut chunks: Vec<Vec<u8>> = Vec::new();

        for piece in input.chunks(777) {
            compressor
                .process(piece, |chunk| {
                    chunks.push(chunk.to_vec());
                    Ok(())
                })
                .unwrap();
        }
        compressor
            .finalize(|chunk| {
                chunks.push(chunk.to_vec());
                Ok(())
            })
            .unwrap();

        assert!(chunks.len() > 1);
        let (last, rest) = chunks.split_last().unwrap();
        assert!(rest.iter().all(|c| c.len() == 64));
        assert!(!last.is_empty() && last.len() <= 64);

        assert_eq!(inflate(&chunks.concat()), input);
    }

    #[test]
    fn test_empty_stream() {
        let mut compressor = IncrementalCompressor::new(6, 16).unwrap();
        let mut out = Vec::new();
        compressor
            .process(b"", |chunk| {
                out.extend_from_slice(chunk);
                Ok(())
            })
            .unwrap();
        compressor
            .finalize(|chunk| {
                out.extend_from_slice(chunk);
                Ok(())
            })
            .unwrap();

        assert!(!out.is_empty());
        assert!(inflate(&out).is_empty());
    }

    #[test]
    fn test_use_after_finalize() {
        let mut compressor = IncrementalCompressor::new(1, 1024).unwrap();
        compressor.process(b"abc", |_| Ok(())).unwrap();
        compressor.finalize(|_| Ok(())).unwrap();
        assert!(compressor.is_finished());

        let mut calls = 0;
        compressor
            .finalize(|_| {
                calls += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(calls, 0);

        assert!(matches!(
            compressor.process(b"more", |_| Ok(())),
            Err(CompressorError::Finished)
        ));
    }

    #[test]
    fn test_invalid_level() {
        assert!(matches!(
            IncrementalCompressor::new(10, 1024),
            Err(CompressorError::Init(_))
        ));
        assert!(matches!(
            IncrementalCompressor::new(6, 0),
            Err(CompressorError::Init(_))
        ));
    }

    #[test]
    fn test_consumer_error_is_reported() {
        let mut compressor = IncrementalCompressor::new(6, 16).unwrap();
        compressor.process(&pseudo_random(1000), |_| Ok(())).unwrap();
        let result = compressor.finalize(|_| Err(io::Error::new(io::ErrorKind::Other, "disk full")));

        assert!(matches!(result, Err(CompressorError::Sink(_))));
        assert!(!compressor.is_finished());
    }
}
