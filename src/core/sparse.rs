/*!
 * Sparse file handling for efficient transfer of zero-heavy files.
 *
 * VM disk images (qcow2, VMDK), database files, and pre-allocated logs are
 * often 90%+ zeros. This module detects zero-regions during CDC chunking
 * (which already reads every byte) and writes proper sparse files at the
 * destination by seeking over zero regions instead of writing them.
 *
 * Unlike rsync, which cannot combine --sparse with --inplace, Orbit's
 * CDC chunks are independently addressable, so sparse + in-place works
 * naturally.
 */

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Sparse file handling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SparseMode {
    /// Detect sparse-eligible chunks automatically during CDC.
    /// Zero chunks are written as holes, non-zero chunks are written normally.
    #[default]
    Auto,

    /// Always check for and create sparse holes (even for small files)
    Always,

    /// Disable sparse handling entirely — write all bytes including zeros.
    Never,
}

/// Statistics from a sparse-aware write operation.
#[derive(Debug, Clone, Default)]
pub struct SparseWriteStats {
    /// Total logical bytes (including holes)
    pub logical_bytes: u64,
    /// Actual bytes written to disk (excluding holes)
    pub physical_bytes: u64,
    /// Number of sparse holes created
    pub holes_created: u64,
    /// Total bytes saved by sparse holes
    pub bytes_saved: u64,
}

impl SparseWriteStats {
    /// Ratio of physical to logical bytes (1.0 = no savings, 0.0 = all holes)
    pub fn density_ratio(&self) -> f64 {
        if self.logical_bytes == 0 {
            1.0
        } else {
            self.physical_bytes as f64 / self.logical_bytes as f64
        }
    }
}

/// Minimum file size to consider for sparse optimization.
/// Files smaller than this are written densely regardless of SparseMode::Auto.
const SPARSE_MIN_FILE_SIZE: u64 = 64 * 1024; // 64 KB

/// Write data chunks to a file, creating sparse holes for all-zero chunks.
///
/// Each chunk is either written normally or skipped (creating a hole) based
/// on its `is_zero` flag. The file is truncated to the correct logical size
/// after writing to ensure trailing holes are properly represented.
///
/// # Arguments
/// * `dest` - Destination file path
/// * `chunks` - Iterator of (offset, length, data, is_zero) tuples
/// * `total_size` - Total logical file size (for final truncation)
/// * `mode` - Sparse handling mode
///
/// # Returns
/// Statistics about the sparse write operation
pub fn write_sparse<I>(
    dest: &Path,
    chunks: I,
    total_size: u64,
    mode: SparseMode,
) -> io::Result<SparseWriteStats>
where
    I: IntoIterator<Item = SparseChunk>,
{
    let sparse_enabled = match mode {
        SparseMode::Never => false,
        SparseMode::Always => true,
        SparseMode::Auto => total_size >= SPARSE_MIN_FILE_SIZE,
    };

    let mut file = File::create(dest)?;
    let mut stats = SparseWriteStats::default();
    stats.logical_bytes = total_size;

    for chunk in chunks {
        if sparse_enabled && chunk.is_zero {
            // Skip writing — seek past the region to create a hole.
            // The filesystem will return zeros when reading this region.
            file.seek(SeekFrom::Start(chunk.offset + chunk.length as u64))?;
            stats.holes_created += 1;
            stats.bytes_saved += chunk.length as u64;
        } else {
            // Write data at the correct offset
            file.seek(SeekFrom::Start(chunk.offset))?;
            file.write_all(&chunk.data)?;
            stats.physical_bytes += chunk.length as u64;
        }
    }

    // Set the final file size. This is critical for:
    // 1. Trailing holes: ensures the file reports the correct logical size
    // 2. Short files: ensures we don't leave the file too small
    file.set_len(total_size)?;
    file.sync_all()?;

    Ok(stats)
}

/// A chunk of data ready for sparse-aware writing.
pub struct SparseChunk {
    pub offset: u64,
    pub length: usize,
    pub data: Vec<u8>,
    pub is_zero: bool,
}

impl From<orbit_core_cdc::Chunk> for SparseChunk {
    fn from(chunk: orbit_core_cdc::Chunk) -> Self {
        Self {
            offset: chunk.offset,
            length: chunk.length,
            data: chunk.data,
            is_zero: chunk.is_zero,
        }
    }
}
