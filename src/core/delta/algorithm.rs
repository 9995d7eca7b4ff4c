/*!
 * Delta algorithm implementation - rsync-inspired block matching
 *
 * Implements the core delta detection algorithm:
 * 1. Generate block signatures for destination file
 * 2. Find matching blocks in source file using rolling checksum
 * 3. Generate delta instructions (Copy existing blocks or insert new data)
 */

use super::checksum::{calculate_strong_hash, RollingHash};
use super::{BlockSignature, DeltaInstruction, DeltaStats, HashAlgorithm, RollingHashAlgo};
use crate::error::Result;
use std::collections::HashMap;
use std::io::Read;

/// Index of block signatures for fast lookup
#[derive(Clone)]
pub struct SignatureIndex {
    /// Map from weak hash to list of signatures with that weak hash
    weak_hash_map: HashMap<u64, Vec<BlockSignature>>,

    /// Block size used for signatures
    block_size: usize,
}

impl SignatureIndex {
    /// Create a new signature index from a list of signatures
    pub fn new(signatures: Vec<BlockSignature>) -> Self {
        let mut weak_hash_map: HashMap<u64, Vec<BlockSignature>> = HashMap::new();
        let block_size = signatures.first().map(|s| s.length).unwrap_or(0);

        for sig in signatures {
            weak_hash_map.entry(sig.weak_hash).or_default().push(sig);
        }

        Self {
            weak_hash_map,
            block_size,
        }
    }

    /// Find a matching block signature for the given weak and strong hashes
    pub fn find_match(&self, weak_hash: u64, strong_hash: &[u8]) -> Option<&BlockSignature> {
        // First check weak hash
        let candidates = self.weak_hash_map.get(&weak_hash)?;

        // Then verify with strong hash
        candidates.iter().find(|sig| sig.strong_hash == strong_hash)
    }

    /// Get the block size
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

/// Generate delta instructions by comparing source with destination signatures
pub fn generate_delta<R: Read>(
    mut source: R,
    dest_signatures: SignatureIndex,
    hash_algorithm: HashAlgorithm,
    rolling_algo: RollingHashAlgo,
) -> Result<(Vec<DeltaInstruction>, DeltaStats)> {
    let block_size = dest_signatures.block_size();
    let mut instructions = Vec::new();
    let mut stats = DeltaStats::new();

    let mut buffer = Vec::new();
    source.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        return Ok((instructions, stats));
    }

    if block_size == 0 {
        stats.total_bytes = buffer.len() as u64;
        instructions.push(DeltaInstruction::Data {
            dest_offset: 0,
            bytes: buffer,
        });
        stats.bytes_transferred = stats.total_bytes;
        stats.calculate_savings_ratio();
        return Ok((instructions, stats));
    }

    stats.total_bytes = buffer.len() as u64;
    stats.total_blocks = (buffer.len() + block_size - 1) as u64 / block_size as u64;

    let mut pos = 0;
    let mut dest_offset = 0u64;
    // Track unmatched bytes by slice range to avoid per-byte buffering.
    let mut pending_start = 0usize;

    while pos < buffer.len() {
        // Try to find a matching block starting at current position
        let remaining = buffer.len() - pos;
        let chunk_size = remaining.min(block_size);
        let chunk = &buffer[pos..pos + chunk_size];

        // Calculate checksums for this block
        let rolling = RollingHash::from_data(chunk, rolling_algo);
        let weak_hash = rolling.hash();
        let strong_hash = calculate_strong_hash(chunk, hash_algorithm);

        // Look for a match in destination signatures
        if let Some(sig) = dest_signatures.find_match(weak_hash, &strong_hash) {
            // Found a match! Flush any pending data first
            if pos > pending_start {
                let bytes = buffer[pending_start..pos].to_vec();
                instructions.push(DeltaInstruction::Data { dest_offset, bytes });
                dest_offset += (pos - pending_start) as u64;
            }

            // Add copy instruction
            instructions.push(DeltaInstruction::Copy {
                src_offset: sig.offset,
                dest_offset,
                length: sig.length,
            });

            dest_offset += sig.length as u64;
            pos += sig.length;
            stats.blocks_matched += 1;
            stats.bytes_saved += sig.length as u64;
            pending_start = pos;
        } else {
            // No match, advance window; copy will be emitted when we find a match
            pos += 1;
        }
    }

    // Flush any remaining pending data
    if pending_start < buffer.len() {
        let tail = buffer[pending_start..].to_vec();
        instructions.push(DeltaInstruction::Data {
            dest_offset,
            bytes: tail,
        });
    }

    stats.blocks_transferred = stats.total_blocks.saturating_sub(stats.blocks_matched);
    stats.bytes_transferred = stats.total_bytes.saturating_sub(stats.bytes_saved);
    stats.calculate_savings_ratio();

    Ok((instructions, stats))
}

/// Optimized delta generation with rolling checksum
///
/// This version uses a rolling window to efficiently search for matches
/// by incrementally updating the checksum rather than recalculating it
/// for every byte position.
pub fn generate_delta_rolling<R: Read>(
    mut source: R,
    dest_signatures: SignatureIndex,
    hash_algorithm: HashAlgorithm,
    rolling_algo: RollingHashAlgo,
) -> Result<(Vec<DeltaInstruction>, DeltaStats)> {
    let block_size = dest_signatures.block_size();
    let mut instructions = Vec::new();
    let mut stats = DeltaStats::new();

    let mut buffer = Vec::new();
    source.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        return Ok((instructions, stats));
    }

    if block_size == 0 {
        stats.total_bytes = buffer.len() as u64;
        instructions.push(DeltaInstruction::Data {
            dest_offset: 0,
            bytes: buffer,
        });
        stats.bytes_transferred = stats.total_bytes;
        stats.calculate_savings_ratio();
        return Ok((instructions, stats));
    }

    stats.total_bytes = buffer.len() as u64;
    stats.total_blocks = buffer.len().div_ceil(block_size) as u64;

    let mut pos = 0;
    let mut dest_offset = 0u64;
    // Track the start of the current non-matching span to emit in one shot.
    let mut pending_start = 0usize;
    let mut rolling: Option<RollingHash> = None;

    while pos + block_size <= buffer.len() {
        // Initialize or roll the checksum
        let weak_hash = if let Some(ref mut roll) = rolling {
            // Roll forward: remove the byte leaving the window, add the new byte.
            // Safety: loop guard ensures pos > 0 has a valid previous byte and
            // pos + block_size - 1 is in-bounds for the new trailing byte.
            let old_byte = if pos > 0 { buffer[pos - 1] } else { buffer[0] };
            let new_byte = buffer[pos + block_size - 1];
            roll.roll(old_byte, new_byte);
            roll.hash()
        } else {
            // Initialize checksum for first block
            let chunk = &buffer[pos..pos + block_size];
            rolling = Some(RollingHash::from_data(chunk, rolling_algo));
            rolling.as_ref().unwrap().hash()
        };

        // Calculate strong hash only if weak hash matches
        let chunk = &buffer[pos..pos + block_size];
        if dest_signatures.weak_hash_map.contains_key(&weak_hash) {
            let strong_hash = calculate_strong_hash(chunk, hash_algorithm);

            if let Some(sig) = dest_signatures.find_match(weak_hash, &strong_hash) {
                // Found a match! Flush any pending data in a single memcpy.
                if pos > pending_start {
                    let bytes = buffer[pending_start..pos].to_vec();
                    instructions.push(DeltaInstruction::Data { dest_offset, bytes });
                    dest_offset += (pos - pending_start) as u64;
                }

                instructions.push(DeltaInstruction::Copy {
                    src_offset: sig.offset,
                    dest_offset,
                    length: sig.length,
                });

                dest_offset += sig.length as u64;
                pos += sig.length;
                stats.blocks_matched += 1;
                stats.bytes_saved += sig.length as u64;
                pending_start = pos;

                // Reset rolling checksum after a match
                rolling = None;
                continue;
            }
        }

        // No match; just advance and keep growing the pending span.
        pos += 1;
    }

    // Flush remaining pending data
    if pending_start < buffer.len() {
        let tail = buffer[pending_start..].to_vec();
        instructions.push(DeltaInstruction::Data {
            dest_offset,
            bytes: tail,
        });
    }

    stats.blocks_transferred = stats.total_blocks.saturating_sub(stats.blocks_matched);
    stats.bytes_transferred = stats.total_bytes.saturating_sub(stats.bytes_saved);
    stats.calculate_savings_ratio();

    Ok((instructions, stats))
}
