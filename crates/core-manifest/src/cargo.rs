//! Cargo Manifest data structures and operations
//!
//! A Cargo Manifest describes a single file's chunking, windowing, and integrity information.

use crate::error::{Error, Result};
use crate::CARGO_MANIFEST_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Cargo Manifest: per-file transfer manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CargoManifest {
    /// Schema version identifier
    pub schema: String,

    /// File path (relative to job root)
    pub path: String,

    /// File size in bytes
    pub size: u64,

    /// Chunking strategy used
    pub chunking: Chunking,

    /// File-level digests (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digests: Option<Digests>,

    /// Window metadata (integrity verification units)
    pub windows: Vec<WindowMeta>,

    /// Extended attributes (metadata, permissions, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xattrs: Option<HashMap<String, serde_json::Value>>,

    /// Overall file digest (set after completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_digest: Option<String>,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunking {
    /// Chunking type (cdc or fixed)
    #[serde(rename = "type")]
    pub chunking_type: String,

    /// Average chunk size in KiB (for CDC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_kib: Option<u32>,

    /// CDC algorithm name (e.g., "gear", "buzhash")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algo: Option<String>,

    /// Fixed chunk size in KiB (for fixed chunking)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_kib: Option<u32>,
}

/// Chunking types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingType {
    /// Content-defined chunking
    Cdc,
    /// Fixed-size chunking
    Fixed,
}

impl ChunkingType {
    /// Convert to string representation
    pub fn as_str(&self) -> &str {
        match self {
            ChunkingType::Cdc => "cdc",
            ChunkingType::Fixed => "fixed",
        }
    }
}

impl FromStr for ChunkingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cdc" => Ok(ChunkingType::Cdc),
            "fixed" => Ok(ChunkingType::Fixed),
            _ => Err(Error::InvalidChunking(format!(
                "Unknown chunking type: {}",
                s
            ))),
        }
    }
}

/// File-level digest collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Digests {
    /// BLAKE3 hash (32 bytes, hex-encoded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blake3: Option<String>,

    /// SHA-256 hash (32 bytes, hex-encoded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Window metadata for integrity verification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowMeta {
    /// Window identifier (sequential)
    pub id: u32,

    /// Index of first chunk in this window
    pub first_chunk: u32,

    /// Number of chunks in this window
    pub count: u16,

    /// Merkle tree root for this window (hex-encoded)
    pub merkle_root: String,

    /// Overlap with previous window (in chunks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap: Option<u16>,
}

impl CargoManifest {
    /// Create a new Cargo Manifest with minimal required fields
    pub fn new<S: Into<String>>(path: S, size: u64, chunking: Chunking) -> Self {
        Self {
            schema: CARGO_MANIFEST_SCHEMA_VERSION.to_string(),
            path: path.into(),
            size,
            chunking,
            digests: None,
            windows: Vec::new(),
            xattrs: None,
            file_digest: None,
        }
    }

    /// Add a window to this manifest
    pub fn add_window(&mut self, window: WindowMeta) {
        self.windows.push(window);
    }

    /// Set file-level digests
    pub fn with_digests(mut self, digests: Digests) -> Self {
        self.digests = Some(digests);
        self
    }

    /// Set extended attributes
    pub fn with_xattrs(mut self, xattrs: HashMap<String, serde_json::Value>) -> Self {
        self.xattrs = Some(xattrs);
        self
    }

    /// Finalize with overall file digest
    pub fn finalize(&mut self, file_digest: String) {
        self.file_digest = Some(file_digest);
    }

    /// Check if the manifest is finalized
    pub fn is_finalized(&self) -> bool {
        self.file_digest.is_some()
    }

    /// Get total number of chunks across all windows
    pub fn total_chunks(&self) -> u32 {
        self.windows.iter().map(|w| w.count as u32).sum()
    }

    /// Validate manifest structure
    pub fn validate(&self) -> Result<()> {
        // Check schema version
        if self.schema != CARGO_MANIFEST_SCHEMA_VERSION {
            return Err(Error::version_mismatch(
                CARGO_MANIFEST_SCHEMA_VERSION,
                &self.schema,
            ));
        }

        // Check path is not empty
        if self.path.is_empty() {
            return Err(Error::validation("Path cannot be empty"));
        }

        // Check chunking configuration
        self.chunking.validate()?;

        // Check windows are sequential
        for (i, window) in self.windows.iter().enumerate() {
            if window.id as usize != i {
                return Err(Error::validation(format!(
                    "Window IDs must be sequential: expected {}, found {}",
                    i, window.id
                )));
            }

            if window.count == 0 {
                return Err(Error::validation(format!(
                    "Window {} has zero chunks",
                    window.id
                )));
            }

            if window.merkle_root.is_empty() {
                return Err(Error::validation(format!(
                    "Window {} missing merkle_root",
                    window.id
                )));
            }
        }

        Ok(())
    }

    /// Save Cargo Manifest to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load Cargo Manifest from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::manifest_not_found(path));
        }

        let contents = std::fs::read_to_string(path)?;
        let manifest: CargoManifest = serde_json::from_str(&contents)?;

        // Validate after loading
        manifest.validate()?;

        Ok(manifest)
    }
}

impl Chunking {
    /// Create CDC chunking configuration
    pub fn cdc(avg_kib: u32, algo: &str) -> Self {
        Self {
            chunking_type: ChunkingType::Cdc.as_str().to_string(),
            avg_kib: Some(avg_kib),
            algo: Some(algo.to_string()),
            fixed_kib: None,
        }
    }

    /// Create fixed chunking configuration
    pub fn fixed(size_kib: u32) -> Self {
        Self {
            chunking_type: ChunkingType::Fixed.as_str().to_string(),
            avg_kib: None,
            algo: None,
            fixed_kib: Some(size_kib),
        }
    }

    /// Validate chunking configuration
    pub fn validate(&self) -> Result<()> {
        let chunk_type = ChunkingType::from_str(&self.chunking_type)?;

        match chunk_type {
            ChunkingType::Cdc => {
                if self.avg_kib.is_none() {
                    return Err(Error::InvalidChunking(
                        "CDC chunking requires avg_kib".to_string(),
                    ));
                }
                if self.algo.is_none() {
                    return Err(Error::InvalidChunking(
                        "CDC chunking requires algo".to_string(),
                    ));
                }
            }
            ChunkingType::Fixed => {
                if self.fixed_kib.is_none() {
                    return Err(Error::InvalidChunking(
                        "Fixed chunking requires fixed_kib".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Digests {
    /// Create a new Digests with no hashes set
    pub fn new() -> Self {
        Self {
            blake3: None,
            sha256: None,
        }
    }

    /// Set BLAKE3 hash
    pub fn with_blake3<S: Into<String>>(mut self, hash: S) -> Self {
        self.blake3 = Some(hash.into());
        self
    }

    /// Set SHA-256 hash
    pub fn with_sha256<S: Into<String>>(mut self, hash: S) -> Self {
        self.sha256 = Some(hash.into());
        self
    }
}

impl Default for Digests {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowMeta {
    /// Create a new window metadata entry
    pub fn new(id: u32, first_chunk: u32, count: u16, merkle_root: String) -> Self {
        Self {
            id,
            first_chunk,
            count,
            merkle_root,
            overlap: None,
        }
    }

    /// Set overlap with previous window
    pub fn with_overlap(mut self, overlap: u16) -> Self {
        self.overlap = Some(overlap);
        self
    }

    /// Get the last chunk index in this window
    pub fn last_chunk(&self) -> u32 {
        self.first_chunk + (self.count as u32) - 1
    }

    /// Check if this window contains a given chunk index
    pub fn contains_chunk(&self, chunk_idx: u32) -> bool {
        chunk_idx >= self.first_chunk && chunk_idx <= self.last_chunk()
    }
}
