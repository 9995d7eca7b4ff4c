//! Composable Prioritizers: Chainable sort criteria for transfer scheduling
//!
//! Instead of a single priority dimension, prioritizers can be stacked:
//! 1. Semantic priority (Critical > High > Normal > Low)
//! 2. Size preference (e.g., smallest-first within same tier)
//! 3. Age tiebreaker (oldest-first)
//!
//! This is more flexible than a single `BinaryHeap` key and allows
//! per-connection customization in the Grid architecture.
//!
//! # Example
//!
//! ```
//! use orbit_core_semantic::prioritizer::{
//!     TransferItem, ComposablePrioritizer, SemanticPrioritizer,
//!     SmallestFirstPrioritizer, OldestFirstPrioritizer,
//! };
//! use orbit_core_semantic::Priority;
//! use std::time::SystemTime;
//!
//! let mut items = vec![
//!     TransferItem::new("large_video.mp4", Priority::Low, 1_000_000, SystemTime::now()),
//!     TransferItem::new("config.toml", Priority::Critical, 512, SystemTime::now()),
//!     TransferItem::new("readme.md", Priority::Normal, 2048, SystemTime::now()),
//! ];
//!
//! // Chain prioritizers: semantic first, then smallest, then oldest
//! let prioritizer = ComposablePrioritizer::new(vec![
//!     Box::new(SemanticPrioritizer),
//!     Box::new(SmallestFirstPrioritizer),
//!     Box::new(OldestFirstPrioritizer),
//! ]);
//!
//! items.sort_by(|a, b| prioritizer.compare(a, b));
//!
//! assert_eq!(items[0].path, "config.toml");   // Critical + smallest
//! assert_eq!(items[1].path, "readme.md");      // Normal
//! assert_eq!(items[2].path, "large_video.mp4"); // Low priority
//! ```

use super::Priority;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::SystemTime;

/// A transfer item with metadata used for prioritization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferItem {
    /// File path (used as identifier)
    pub path: String,

    /// Semantic priority tier
    pub priority: Priority,

    /// File size in bytes
    pub size: u64,

    /// When this item was discovered/queued
    pub queued_at: SystemTime,

    /// Number of retry attempts
    pub retry_count: u32,
}

impl TransferItem {
    /// Create a new transfer item
    pub fn new(path: &str, priority: Priority, size: u64, queued_at: SystemTime) -> Self {
        Self {
            path: path.to_string(),
            priority,
            size,
            queued_at,
            retry_count: 0,
        }
    }
}

/// Trait for a single prioritization criterion.
///
/// Returns `Ordering::Equal` if this criterion can't distinguish the two items,
/// allowing the next prioritizer in the chain to break the tie.
pub trait Prioritizer: Send + Sync {
    /// Compare two transfer items. `Less` means `a` should come first.
    fn compare(&self, a: &TransferItem, b: &TransferItem) -> Ordering;

    /// Human-readable name of this prioritizer
    fn name(&self) -> &str;
}

/// Chains multiple prioritizers: first non-Equal result wins.
pub struct ComposablePrioritizer {
    chain: Vec<Box<dyn Prioritizer>>,
}

impl ComposablePrioritizer {
    /// Create a new composable prioritizer from an ordered list
    pub fn new(chain: Vec<Box<dyn Prioritizer>>) -> Self {
        Self { chain }
    }

    /// Compare two items using the chain of prioritizers
    pub fn compare(&self, a: &TransferItem, b: &TransferItem) -> Ordering {
        for p in &self.chain {
            let ord = p.compare(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Get the names of all prioritizers in the chain
    pub fn chain_names(&self) -> Vec<&str> {
        self.chain.iter().map(|p| p.name()).collect()
    }
}

/// Default chain: semantic priority, then smallest-first, then oldest-first
impl Default for ComposablePrioritizer {
    fn default() -> Self {
        Self::new(vec![
            Box::new(SemanticPrioritizer),
            Box::new(SmallestFirstPrioritizer),
            Box::new(OldestFirstPrioritizer),
        ])
    }
}

// ── Built-in Prioritizers ──

/// Prioritize by semantic tier (Critical < High < Normal < Low)
pub struct SemanticPrioritizer;

impl Prioritizer for SemanticPrioritizer {
    fn compare(&self, a: &TransferItem, b: &TransferItem) -> Ordering {
        a.priority.cmp(&b.priority)
    }

    fn name(&self) -> &str {
        "semantic"
    }
}

/// Prioritize smaller files first (maximizes completed-file count)
pub struct SmallestFirstPrioritizer;

impl Prioritizer for SmallestFirstPrioritizer {
    fn compare(&self, a: &TransferItem, b: &TransferItem) -> Ordering {
        a.size.cmp(&b.size)
    }

    fn name(&self) -> &str {
        "smallest_first"
    }
}

/// Prioritize larger files first (maximizes throughput utilization)
pub struct LargestFirstPrioritizer;

impl Prioritizer for LargestFirstPrioritizer {
    fn compare(&self, a: &TransferItem, b: &TransferItem) -> Ordering {
        b.size.cmp(&a.size) // Reversed
    }

    fn name(&self) -> &str {
        "largest_first"
    }
}

/// Prioritize oldest items first (FIFO within same tier)
pub struct OldestFirstPrioritizer;

impl Prioritizer for OldestFirstPrioritizer {
    fn compare(&self, a: &TransferItem, b: &TransferItem) -> Ordering {
        a.queued_at.cmp(&b.queued_at)
    }

    fn name(&self) -> &str {
        "oldest_first"
    }
}

/// Prioritize newest items first (real-time dashboard use case)
pub struct NewestFirstPrioritizer;

impl Prioritizer for NewestFirstPrioritizer {
    fn compare(&self, a: &TransferItem, b: &TransferItem) -> Ordering {
        b.queued_at.cmp(&a.queued_at) // Reversed
    }

    fn name(&self) -> &str {
        "newest_first"
    }
}

/// Prioritize items with fewer retries (favor fresh items over retried ones)
pub struct FewestRetriesPrioritizer;

impl Prioritizer for FewestRetriesPrioritizer {
    fn compare(&self, a: &TransferItem, b: &TransferItem) -> Ordering {
        a.retry_count.cmp(&b.retry_count)
    }

    fn name(&self) -> &str {
        "fewest_retries"
    }
}
