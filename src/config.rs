//! Writer-wide and per-entry settings

use crate::format::{CompressionMethod, DosDateTime};

/// Default DEFLATE level
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Default size of the compressor's output buffer (16 KiB)
pub const DEFAULT_BUFFER_CAPACITY: usize = 16 * 1024;

/// Settings shared by every entry of one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// DEFLATE level (0-9) for entries that do not override it
    pub compression_level: u32,
    /// Capacity of the bounded buffer compressed bytes are drained through
    pub buffer_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl WriterConfig {
    /// Set the default DEFLATE level
    ///
    /// # Panics
    /// Panics if `level` is greater than 9.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        assert!(level <= 9, "compression_level must be between 0 and 9");
        self.compression_level = level;
        self
    }

    /// Set the compressor output buffer capacity
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "buffer_capacity must be at least 1");
        self.buffer_capacity = capacity;
        self
    }
}

/// Options for a single entry
///
/// ```
/// use seekzip::{CompressionMethod, DosDateTime, EntryOptions};
///
/// let options = EntryOptions::new(CompressionMethod::Stored)
///     .modified(DosDateTime::from_date_and_time(2024, 3, 1, 9, 0, 0).unwrap())
///     .permissions(0o600);
/// assert_eq!(options.method, CompressionMethod::Stored);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOptions {
    pub method: CompressionMethod,
    /// Defaults to the current UTC time when the entry begins
    pub modified: Option<DosDateTime>,
    /// Defaults to 0o644 for files and 0o755 for directories
    pub permissions: Option<u32>,
    /// Overrides [`WriterConfig::compression_level`]
    pub compression_level: Option<u32>,
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self::new(CompressionMethod::default())
    }
}

impl EntryOptions {
    pub fn new(method: CompressionMethod) -> Self {
        Self {
            method,
            modified: None,
            permissions: None,
            compression_level: None,
        }
    }

    /// Shorthand for `EntryOptions::new(CompressionMethod::Stored)`
    pub fn stored() -> Self {
        Self::new(CompressionMethod::Stored)
    }

    /// Shorthand for `EntryOptions::new(CompressionMethod::Deflate)`
    pub fn deflated() -> Self {
        Self::new(CompressionMethod::Deflate)
    }

    pub fn modified(mut self, modified: DosDateTime) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn permissions(mut self, permissions: u32) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level);
        self
    }
}
