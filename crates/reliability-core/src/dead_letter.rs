//! Dead-Letter Queue: bounded storage for operations the self-healer
//! gave up retrying.
//!
//! When `SelfHealer::execute_with_healing` exhausts its retries, the
//! failed operation is routed here instead of being silently lost. This
//! is a direct generalization of the teacher's `DeadLetterQueue`: same
//! bounded FIFO with oldest-drop overflow and the same stats shape, but
//! the entry itself is redesigned. The teacher enqueues transfer-specific
//! fields (`item_key`, `source_path`, `dest_path`); per the design note on
//! closures in the dead-letter queue, an entry here is a serializable
//! *descriptor* -- an operation identifier, a digest of its input rather
//! than the input itself, and a snapshot of the config in effect at
//! failure time -- never the operation closure, which would otherwise
//! trap arbitrary captured state indefinitely.

use std::collections::VecDeque;
use std::time::SystemTime;

/// Reason an operation was sent to the dead-letter queue.
#[derive(Debug, Clone)]
pub enum FailureReason {
    /// The healer exhausted `max_retries` attempts.
    RetriesExhausted { attempts: u32 },
    /// The operation raised a permanent (non-transient) error; the healer
    /// never retried it.
    PermanentError,
    /// A registered recovery strategy ran but reported failure.
    RecoveryFailed { strategy: String },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::RetriesExhausted { attempts } => {
                write!(f, "retries exhausted after {attempts} attempts")
            }
            FailureReason::PermanentError => write!(f, "permanent error"),
            FailureReason::RecoveryFailed { strategy } => {
                write!(f, "recovery strategy '{strategy}' failed")
            }
        }
    }
}

/// A descriptor for an operation that failed permanently.
///
/// Deliberately does not hold the operation itself (a closure would trap
/// whatever it captured for the life of the queue entry). Re-execution,
/// if desired, is an explicit admin operation that rebuilds the call from
/// this descriptor.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    /// Identifies the logical operation (e.g. `"orders.charge"`).
    pub operation_id: String,
    /// Digest of the operation's input, not the input itself.
    pub input_digest: Option<String>,
    /// Human-readable snapshot of the healer config in effect at failure time.
    pub config_snapshot: String,
    /// Why this entry was dead-lettered.
    pub failure_reason: FailureReason,
    /// The final error's display text.
    pub last_error: String,
    /// When this operation's retry sequence started.
    pub first_failed_at: SystemTime,
    /// When the final attempt failed.
    pub last_failed_at: SystemTime,
}

/// In-memory dead-letter queue with bounded capacity per name.
///
/// Entries beyond capacity are dropped oldest-first, with an event
/// recorded in [`DeadLetterStats::total_dropped`]. The caller may flush
/// entries to persistent storage via [`DeadLetterQueue::drain`].
#[derive(Debug)]
pub struct DeadLetterQueue {
    entries: VecDeque<DeadLetterEntry>,
    max_capacity: usize,
    total_received: u64,
    total_dropped: u64,
}

impl DeadLetterQueue {
    pub fn new(max_capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_capacity.min(1024)),
            max_capacity,
            total_received: 0,
            total_dropped: 0,
        }
    }

    /// Push an entry, dropping the oldest if at capacity.
    pub fn push(&mut self, entry: DeadLetterEntry) {
        self.total_received += 1;

        if self.entries.len() >= self.max_capacity {
            self.entries.pop_front();
            self.total_dropped += 1;
        }

        self.entries.push_back(entry);
    }

    /// Drain all entries (for flushing to persistent storage).
    pub fn drain(&mut self) -> Vec<DeadLetterEntry> {
        self.entries.drain(..).collect()
    }

    pub fn entries(&self) -> &VecDeque<DeadLetterEntry> {
        &self.entries
    }

    pub fn entries_for_operation(&self, operation_id: &str) -> Vec<&DeadLetterEntry> {
        self.entries
            .iter()
            .filter(|e| e.operation_id == operation_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> DeadLetterStats {
        DeadLetterStats {
            current_count: self.entries.len(),
            max_capacity: self.max_capacity,
            total_received: self.total_received,
            total_dropped: self.total_dropped,
        }
    }
}

/// Statistics for the dead-letter queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterStats {
    pub current_count: usize,
    pub max_capacity: usize,
    pub total_received: u64,
    pub total_dropped: u64,
}
