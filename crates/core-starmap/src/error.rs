//! Error types for Star Map operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for Star Map operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during Star Map operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Star Map file not found
    #[error("Star Map not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid Star Map format
    #[error("Invalid Star Map format: {reason}")]
    InvalidFormat { reason: String },

    /// Version mismatch
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u16, found: u16 },

    /// Invalid magic number (file is not a Star Map)
    #[error("Invalid magic number: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: Vec<u8>, found: Vec<u8> },

    /// Chunk index out of bounds
    #[error("Chunk index out of bounds: {index} >= {count}")]
    ChunkIndexOutOfBounds { index: u32, count: u32 },

    /// Window index out of bounds
    #[error("Window index out of bounds: {index} >= {count}")]
    WindowIndexOutOfBounds { index: u32, count: u32 },

    /// Invalid content ID size
    #[error("Invalid content ID size: expected {expected}, found {found}")]
    InvalidContentIdSize { expected: usize, found: usize },

    /// Invalid merkle root size
    #[error("Invalid merkle root size: expected {expected}, found {found}")]
    InvalidMerkleRootSize { expected: usize, found: usize },

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MemoryMapFailed(String),

    /// Bloom filter error
    #[error("Bloom filter error: {0}")]
    BloomFilter(String),

    /// Bitmap error
    #[error("Bitmap error: {0}")]
    Bitmap(String),

    /// Data corruption detected
    #[error("Data corruption detected: {reason}")]
    CorruptData { reason: String },

    /// Empty Star Map (no chunks or windows)
    #[error("Empty Star Map: must contain at least one chunk and one window")]
    Empty,

    /// Invalid window configuration
    #[error("Invalid window configuration: {0}")]
    InvalidWindow(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(reason: S) -> Self {
        Error::InvalidFormat {
            reason: reason.into(),
        }
    }

    /// Create a version mismatch error
    pub fn version_mismatch(expected: u16, found: u16) -> Self {
        Error::VersionMismatch { expected, found }
    }

    /// Create a not found error
    pub fn not_found<P: Into<PathBuf>>(path: P) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Create a chunk index out of bounds error
    pub fn chunk_index_out_of_bounds(index: u32, count: u32) -> Self {
        Error::ChunkIndexOutOfBounds { index, count }
    }

    /// Create a window index out of bounds error
    pub fn window_index_out_of_bounds(index: u32, count: u32) -> Self {
        Error::WindowIndexOutOfBounds { index, count }
    }

    /// Create an invalid content ID size error
    pub fn invalid_content_id_size(expected: usize, found: usize) -> Self {
        Error::InvalidContentIdSize { expected, found }
    }

    /// Create an invalid merkle root size error
    pub fn invalid_merkle_root_size(expected: usize, found: usize) -> Self {
        Error::InvalidMerkleRootSize { expected, found }
    }

    /// Create a memory mapping error
    pub fn memory_map_failed<S: Into<String>>(message: S) -> Self {
        Error::MemoryMapFailed(message.into())
    }

    /// Create a bloom filter error
    pub fn bloom_filter<S: Into<String>>(message: S) -> Self {
        Error::BloomFilter(message.into())
    }

    /// Create a bitmap error
    pub fn bitmap<S: Into<String>>(message: S) -> Self {
        Error::Bitmap(message.into())
    }

    /// Create a corrupt data error
    pub fn corrupt_data<S: Into<String>>(reason: S) -> Self {
        Error::CorruptData {
            reason: reason.into(),
        }
    }

    /// Create an invalid window error
    pub fn invalid_window<S: Into<String>>(message: S) -> Self {
        Error::InvalidWindow(message.into())
    }
}
