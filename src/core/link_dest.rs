/*!
 * Reference directory hardlinking for incremental backups (link-dest++).
 *
 * rsync's `--link-dest=DIR` creates hardlinks to unchanged files from a
 * reference directory, enabling space-efficient incremental backups.
 * However, rsync's approach is all-or-nothing: if a file is byte-identical,
 * it's hardlinked; if even one byte differs, the whole file is copied.
 *
 * Orbit's link-dest++ improves on this with chunk-level granularity:
 * - **Full match**: All chunks exist in reference → hardlink (same as rsync)
 * - **Partial match**: Some chunks match → use reference as delta basis,
 *   transferring only the changed chunks (rsync can't do this)
 * - **No match**: No chunk overlap → full transfer
 *
 * This means that even when a file has been partially modified since the
 * reference backup, Orbit only transfers the changed portions.
 */

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Decision on how to handle a file given reference directory content.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkDecision {
    /// All chunks exist in the reference file — create a hardlink.
    /// No data transfer needed. Path is the reference file to link from.
    Hardlink(PathBuf),

    /// Partial chunk overlap — use reference as delta basis.
    /// Transfer only non-matching chunks. Path is the reference basis file.
    DeltaBasis {
        reference: PathBuf,
        overlap: f64,
    },

    /// No useful match in any reference directory — full transfer.
    FullTransfer,
}

/// Resolves files against reference directories to determine the most
/// efficient transfer strategy for each file.
pub struct LinkDestResolver {
    /// Reference directories to check (in priority order)
    reference_dirs: Vec<PathBuf>,

    /// Minimum overlap ratio to use a reference as delta basis.
    /// Below this threshold, a full transfer is cheaper than computing deltas.
    delta_threshold: f64,
}

impl LinkDestResolver {
    /// Create a new resolver with the given reference directories.
    ///
    /// Directories are checked in order; the first match wins.
    pub fn new(reference_dirs: Vec<PathBuf>) -> Self {
        Self {
            reference_dirs,
            delta_threshold: 0.3, // 30% overlap = worth using as delta basis
        }
    }

    /// Set the minimum overlap ratio for delta basis usage.
    pub fn with_delta_threshold(mut self, threshold: f64) -> Self {
        self.delta_threshold = threshold;
        self
    }

    /// Resolve a source file against reference directories.
    ///
    /// Checks each reference directory for a file at the same relative path.
    /// If found, compares chunk hashes to determine the best strategy.
    ///
    /// # Arguments
    /// * `relative_path` - Path relative to the source/destination root
    /// * `source_chunk_hashes` - BLAKE3 hashes of the source file's chunks
    /// * `reference_chunk_hashes_fn` - Function to get chunk hashes for a reference file
    pub fn resolve<F>(
        &self,
        relative_path: &Path,
        source_chunk_hashes: &[[u8; 32]],
        reference_chunk_hashes_fn: F,
    ) -> LinkDecision
    where
        F: Fn(&Path) -> Option<Vec<[u8; 32]>>,
    {
        if source_chunk_hashes.is_empty() {
            return LinkDecision::FullTransfer;
        }

        for ref_dir in &self.reference_dirs {
            let ref_file = ref_dir.join(relative_path);
            if !ref_file.exists() {
                continue;
            }

            // Get chunk hashes for the reference file
            let ref_hashes = match reference_chunk_hashes_fn(&ref_file) {
                Some(h) => h,
                None => continue,
            };

            // Calculate overlap
            let ref_set: HashSet<[u8; 32]> = ref_hashes.iter().copied().collect();
            let shared = source_chunk_hashes
                .iter()
                .filter(|h| ref_set.contains(*h))
                .count();
            let overlap = shared as f64 / source_chunk_hashes.len() as f64;

            if (overlap - 1.0).abs() < f64::EPSILON && ref_hashes.len() == source_chunk_hashes.len()
            {
                // Perfect match — all chunks identical and same count
                return LinkDecision::Hardlink(ref_file);
            }

            if overlap >= self.delta_threshold {
                return LinkDecision::DeltaBasis {
                    reference: ref_file,
                    overlap,
                };
            }
        }

        LinkDecision::FullTransfer
    }

    /// Quick check: does any reference directory have a file at this path
    /// with the exact same size and modification time?
    ///
    /// This is a cheap pre-filter before the more expensive chunk comparison.
    pub fn quick_match(&self, relative_path: &Path, source_size: u64, source_mtime: std::time::SystemTime) -> Option<PathBuf> {
        for ref_dir in &self.reference_dirs {
            let ref_file = ref_dir.join(relative_path);
            if let Ok(meta) = std::fs::metadata(&ref_file) {
                if meta.len() == source_size {
                    if let Ok(mtime) = meta.modified() {
                        if mtime == source_mtime {
                            return Some(ref_file);
                        }
                    }
                }
            }
        }
        None
    }
}
