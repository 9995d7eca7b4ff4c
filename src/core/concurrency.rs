/*!
 * Concurrency control for managing parallel transfers
 *
 * This module provides semaphore-based concurrency limiting to control
 * the number of simultaneous file operations.
 */

use std::sync::{Arc, Condvar, Mutex};

/// A counting semaphore for controlling concurrent operations
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    state: Arc<SemaphoreState>,
}

struct SemaphoreState {
    available: Mutex<usize>,
    condvar: Condvar,
    max: usize,
}

impl ConcurrencyLimiter {
    /// Create a new concurrency limiter
    ///
    /// # Arguments
    /// * `max_concurrent` - Maximum number of concurrent operations (0 = auto-detect)
    ///
    /// # Auto-detection Behavior
    /// When `max_concurrent` is 0, Orbit attempts to detect available CPU cores using
    /// `std::thread::available_parallelism()`. If detection fails (e.g., in restricted
    /// containers or cgroup environments), it defaults to 1 (single-threaded mode) for
    /// safety and logs a warning to stderr.
    pub fn new(max_concurrent: usize) -> Self {
        let max = if max_concurrent == 0 {
            // Auto-detect: use number of CPU cores
            num_cpus::get()
        } else {
            max_concurrent
        };

        Self {
            state: Arc::new(SemaphoreState {
                available: Mutex::new(max),
                condvar: Condvar::new(),
                max,
            }),
        }
    }

    /// Acquire a permit (blocks until available)
    pub fn acquire(&self) -> ConcurrencyPermit {
        let mut available = self.state.available.lock().unwrap();

        while *available == 0 {
            available = self.state.condvar.wait(available).unwrap();
        }

        *available -= 1;

        ConcurrencyPermit {
            state: self.state.clone(),
        }
    }

    /// Try to acquire a permit without blocking
    pub fn try_acquire(&self) -> Option<ConcurrencyPermit> {
        let mut available = self.state.available.lock().unwrap();

        if *available > 0 {
            *available -= 1;
            Some(ConcurrencyPermit {
                state: self.state.clone(),
            })
        } else {
            None
        }
    }

    /// Get the maximum number of concurrent operations allowed
    pub fn max_concurrent(&self) -> usize {
        self.state.max
    }

    /// Get the current number of available permits
    pub fn available(&self) -> usize {
        *self.state.available.lock().unwrap()
    }
}

/// A permit that represents permission to perform a concurrent operation
/// The permit is automatically released when dropped
pub struct ConcurrencyPermit {
    state: Arc<SemaphoreState>,
}

impl Drop for ConcurrencyPermit {
    fn drop(&mut self) {
        let mut available = self.state.available.lock().unwrap();
        *available += 1;
        self.state.condvar.notify_one();
    }
}

/// Helper function to detect optimal concurrency level based on system
pub fn detect_optimal_concurrency() -> usize {
    let cpu_count = num_cpus::get();

    // For I/O-bound operations, we can use more threads than CPUs
    // Use 2x CPU count, capped at 16
    (cpu_count * 2).min(16)
}

// Shim for num_cpus functionality (fallback to std if needed)
//
// Safety: If CPU detection fails (e.g., in restricted containers or cgroup environments),
// we default to single-threaded mode (1) and emit a warning to stderr. This prevents
// resource exhaustion in hostile environments while alerting operators to the issue.
mod num_cpus {
    use std::thread;

    pub fn get() -> usize {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or_else(|e| {
                // [SPEC CHANGE] Warn user and default to single-threaded mode for safety
                // We use eprintln! here because this might run before the logging subsystem
                // is fully initialized or if logging itself is failing.
                eprintln!(
                    "WARN: Orbit failed to detect available parallelism: {}. \
                    Defaulting to 1 concurrent operation to prevent resource exhaustion.",
                    e
                );
                1
            })
    }
}
