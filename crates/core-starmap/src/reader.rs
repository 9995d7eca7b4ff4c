//! Star Map reader for querying binary indices

use crate::error::{Error, Result};
use crate::{BloomFilter, ChunkMeta, RankSelectBitmap, WindowMeta, StarMapData};
use crate::{STARMAP_MAGIC, STARMAP_VERSION};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Reader for querying Star Map binary indices via memory mapping
///
/// # Example
/// ```no_run
/// use orbit_core_starmap::StarMapReader;
///
/// let reader = StarMapReader::open("file.starmap.bin").unwrap();
/// 
/// // Check if a chunk exists
/// let content_id = [1u8; 32];
/// if reader.has_chunk(&content_id).unwrap() {
///     println!("Chunk exists!");
/// }
///
/// // Get chunk metadata
/// let chunk = reader.get_chunk(0).unwrap();
/// println!("Chunk offset: {}, length: {}", chunk.offset, chunk.length);
///
/// // Find missing chunks in a window
/// let missing = reader.next_missing(0).unwrap();
/// println!("Missing chunks: {:?}", missing);
/// ```
#[derive(Debug)]
pub struct StarMapReader {
    /// Memory-mapped file
    _mmap: Arc<Mmap>,
    /// Deserialized Star Map data
    data: StarMapData,
    /// Cached bloom filter
    bloom: BloomFilter,
    /// Cached bitmaps (one per window)
    bitmaps: Vec<RankSelectBitmap>,
}

impl StarMapReader {
    /// Open and memory-map a Star Map file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        
        if !path.exists() {
            return Err(Error::not_found(path));
        }

        // Open and memory-map the file
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let mmap = Arc::new(mmap);

        // Verify magic number
        if mmap.len() < 8 {
            return Err(Error::invalid_format("File too small"));
        }

        if &mmap[0..8] != STARMAP_MAGIC {
            return Err(Error::InvalidMagic {
                expected: STARMAP_MAGIC.to_vec(),
                found: mmap[0..8].to_vec(),
            });
        }

        // Deserialize from bincode (skip magic header)
        let data: StarMapData = bincode::deserialize(&mmap[8..])
            .map_err(|e| Error::invalid_format(format!("Deserialization failed: {}", e)))?;

        // Validate version
        if data.version != STARMAP_VERSION {
            return Err(Error::version_mismatch(STARMAP_VERSION, data.version));
        }

        // Reconstruct bloom filter from data
        let bloom = BloomFilter::from_bytes(
            &data.bloom_data,
            data.bloom_hashes,
            data.bloom_elements,
            data.bloom_bits,
        )?;

        // Reconstruct bitmaps
        let mut bitmaps = Vec::new();
        for (i, bitmap_data) in data.bitmaps.iter().enumerate() {
            if i >= data.windows.len() {
                return Err(Error::corrupt_data("More bitmaps than windows"));
            }
            let window_size = data.windows[i].count as usize;
            let bitmap = RankSelectBitmap::from_bytes(bitmap_data, window_size)?;
            bitmaps.push(bitmap);
        }

        Ok(Self {
            _mmap: mmap,
            data,
            bloom,
            bitmaps,
        })
    }

    /// Check if a chunk with the given content ID might exist
    ///
    /// Returns `true` if the chunk might be present (may be false positive).
    /// Returns `false` if the chunk is definitely not present.
    pub fn has_chunk(&self, content_id: &[u8; 32]) -> Result<bool> {
        Ok(self.bloom.contains(content_id))
    }

    /// Get the total number of chunks
    pub fn chunk_count(&self) -> Result<u32> {
        Ok(self.data.chunk_count)
    }

    /// Get the total number of windows
    pub fn window_count(&self) -> Result<u32> {
        Ok(self.data.window_count)
    }

    /// Get the file size
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.data.file_size)
    }

    /// Get chunk metadata by index
    pub fn get_chunk(&self, index: u32) -> Result<ChunkMeta> {
        if index as usize >= self.data.chunks.len() {
            return Err(Error::chunk_index_out_of_bounds(
                index,
                self.data.chunks.len() as u32,
            ));
        }

        Ok(self.data.chunks[index as usize].clone())
    }

    /// Get window metadata by index
    pub fn get_window(&self, index: u32) -> Result<WindowMeta> {
        if index as usize >= self.data.windows.len() {
            return Err(Error::window_index_out_of_bounds(
                index,
                self.data.windows.len() as u32,
            ));
        }

        Ok(self.data.windows[index as usize].clone())
    }

    /// Get the bitmap for a specific window
    pub fn get_bitmap(&self, window_id: u32) -> Result<&RankSelectBitmap> {
        if window_id as usize >= self.bitmaps.len() {
            return Err(Error::window_index_out_of_bounds(
                window_id,
                self.bitmaps.len() as u32,
            ));
        }

        Ok(&self.bitmaps[window_id as usize])
    }

    /// Get all missing (not yet transferred) chunk indices for a window
    ///
    /// Returns a vector of chunk indices (relative to the window) that are not yet complete.
    pub fn next_missing(&self, window_id: u32) -> Result<Vec<u32>> {
        let bitmap = self.get_bitmap(window_id)?;
        let unset = bitmap.get_unset_positions();
        Ok(unset.into_iter().map(|i| i as u32).collect())
    }

    /// Get all completed chunk indices for a window
    pub fn get_completed(&self, window_id: u32) -> Result<Vec<u32>> {
        let bitmap = self.get_bitmap(window_id)?;
        let set = bitmap.get_set_positions();
        Ok(set.into_iter().map(|i| i as u32).collect())
    }

    /// Check if a specific chunk in a window is completed
    pub fn is_chunk_complete(&self, window_id: u32, chunk_index: u32) -> Result<bool> {
        let bitmap = self.get_bitmap(window_id)?;
        Ok(bitmap.get(chunk_index as usize))
    }

    /// Get completion statistics for a window
    pub fn window_stats(&self, window_id: u32) -> Result<WindowStats> {
        let bitmap = self.get_bitmap(window_id)?;
        let window = self.get_window(window_id)?;

        Ok(WindowStats {
            window_id,
            total_chunks: window.count as u32,
            completed_chunks: bitmap.count_ones(),
            missing_chunks: bitmap.count_zeros(),
            completion_percent: (bitmap.count_ones() as f64 / window.count as f64) * 100.0,
        })
    }

    /// Get overall completion statistics
    pub fn overall_stats(&self) -> Result<OverallStats> {
        let window_count = self.window_count()?;
        let mut total_chunks = 0u32;
        let mut completed_chunks = 0u32;

        for window_id in 0..window_count {
            let stats = self.window_stats(window_id)?;
            total_chunks += stats.total_chunks;
            completed_chunks += stats.completed_chunks;
        }

        Ok(OverallStats {
            total_windows: window_count,
            total_chunks,
            completed_chunks,
            missing_chunks: total_chunks - completed_chunks,
            completion_percent: if total_chunks > 0 {
                (completed_chunks as f64 / total_chunks as f64) * 100.0
            } else {
                0.0
            },
        })
    }
}

/// Statistics for a single window
#[derive(Debug, Clone)]
pub struct WindowStats {
    pub window_id: u32,
    pub total_chunks: u32,
    pub completed_chunks: u32,
    pub missing_chunks: u32,
    pub completion_percent: f64,
}

/// Overall completion statistics
#[derive(Debug, Clone)]
pub struct OverallStats {
    pub total_windows: u32,
    pub total_chunks: u32,
    pub completed_chunks: u32,
    pub missing_chunks: u32,
    pub completion_percent: f64,
}

// Star Map reader is thread-safe for reading
unsafe impl Send for StarMapReader {}
unsafe impl Sync for StarMapReader {}
