//! Circuit Breaker: per-dependency three-state fault isolation.
//!
//! Closed → calls flow normally, failures accumulate in a sliding window.
//! Open → every call is rejected until the cooldown elapses, then exactly
//! one admission transitions to HalfOpen. HalfOpen → a single probe call
//! decides whether to return to Closed or reopen.
//!
//! This is a from-scratch rewrite of the teacher crate's breaker: the
//! teacher trips on bare consecutive failures with no request-volume gate
//! and folds retry/backoff directly into `execute`. Here, admission and
//! retry are split apart (retry now lives in `healer`) and the breaker
//! gains the sliding failure window and `min_request_volume` gate, plus
//! the single-probe discipline during HalfOpen.

use crate::clock::{Clock, SystemClock};
use crate::error::{FailureKind, ResilienceError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Public state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// A single counted failure, kept for the sliding window (§3: "timestamp,
/// error kind").
#[derive(Debug, Clone, Copy)]
struct FailureRecord {
    at: Instant,
    kind: FailureKind,
}

/// Maximum number of failure records retained regardless of window width.
const MAX_FAILURE_RING: usize = 100;

/// Configuration for circuit breaker behavior.
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Failures within the sliding window before the circuit opens.
    pub open_after_failures: usize,
    /// Consecutive HalfOpen successes required to close the circuit.
    pub close_after_successes: usize,
    /// How long the circuit stays Open before admitting a HalfOpen probe.
    pub open_duration: Duration,
    /// Minimum total calls observed before the circuit is allowed to trip
    /// (prevents a handful of early failures from opening the circuit).
    pub min_request_volume: usize,
    /// Width of the sliding failure-counting window.
    pub window_duration: Duration,
    /// Predicate deciding whether an error counts toward the failure
    /// window. Defaults to [`ResilienceError::should_trip_breaker`].
    pub counts_as_failure: Arc<dyn Fn(&ResilienceError) -> bool + Send + Sync>,
}

impl std::fmt::Debug for CircuitBreakerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerConfig")
            .field("open_after_failures", &self.open_after_failures)
            .field("close_after_successes", &self.close_after_successes)
            .field("open_duration", &self.open_duration)
            .field("min_request_volume", &self.min_request_volume)
            .field("window_duration", &self.window_duration)
            .finish_non_exhaustive()
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            open_after_failures: 5,
            close_after_successes: 3,
            open_duration: Duration::from_secs(60),
            min_request_volume: 10,
            window_duration: Duration::from_secs(300),
            counts_as_failure: Arc::new(ResilienceError::should_trip_breaker),
        }
    }
}

struct Inner {
    state: CircuitState,
    /// Sliding window of counted failures, oldest first.
    failures: VecDeque<FailureRecord>,
    /// Total calls admitted since the last reset (gates `min_request_volume`).
    total_calls: usize,
    /// Consecutive successes while HalfOpen.
    half_open_successes: usize,
    /// Set when Open; the earliest time a HalfOpen probe may be admitted.
    open_until: Option<Instant>,
    /// Set on entry to HalfOpen; bounds how long a hung probe may occupy
    /// the HalfOpen slot before the breaker gives up and reopens
    /// (`halfopen_deadline = first_halfopen_entry + recovery_timeout`).
    half_open_entered_at: Option<Instant>,
    /// True while a HalfOpen probe is in flight; blocks concurrent
    /// callers from being admitted as a second probe.
    half_open_probe_in_flight: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: VecDeque::new(),
            total_calls: 0,
            half_open_successes: 0,
            open_until: None,
            half_open_entered_at: None,
            half_open_probe_in_flight: false,
        }
    }

    fn reset_counters(&mut self) {
        self.failures.clear();
        self.total_calls = 0;
        self.half_open_successes = 0;
    }

    fn evict_expired(&mut self, now: Instant, window: Duration) {
        while let Some(front) = self.failures.front() {
            if now.duration_since(front.at) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Per-dependency circuit breaker.
///
/// Cloning a `CircuitBreaker` shares the same underlying state (it is an
/// `Arc` handle internally).
#[derive(Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Arc<Mutex<Inner>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration,
    /// using the system clock.
    pub fn new(name: impl Into<Arc<str>>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    /// Create a new circuit breaker with an injected clock (for tests).
    pub fn with_clock(
        name: impl Into<Arc<str>>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Arc::new(Mutex::new(Inner::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current externally-visible state, after applying any time-driven
    /// transition (Open → HalfOpen once the cooldown has elapsed).
    pub async fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().await;
        self.update_state(&mut inner);
        inner.state
    }

    pub async fn is_closed(&self) -> bool {
        self.state().await == CircuitState::Closed
    }

    pub async fn is_open(&self) -> bool {
        self.state().await == CircuitState::Open
    }

    pub async fn is_half_open(&self) -> bool {
        self.state().await == CircuitState::HalfOpen
    }

    /// Force the circuit open, bypassing the failure threshold.
    pub async fn force_open(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CircuitState::Open;
        inner.open_until = Some(self.clock.now() + self.config.open_duration);
        inner.half_open_probe_in_flight = false;
    }

    /// Force the circuit closed and reset all counters.
    pub async fn force_closed(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CircuitState::Closed;
        inner.open_until = None;
        inner.half_open_entered_at = None;
        inner.half_open_probe_in_flight = false;
        inner.reset_counters();
    }

    /// Reset the breaker to a fresh Closed state.
    pub async fn reset(&self) {
        self.force_closed().await;
    }

    /// Time-driven state transition: Open → HalfOpen once `open_until` has
    /// elapsed, and a hung HalfOpen probe → Open once its dwell deadline
    /// has elapsed. Must be called under the lock before any admission
    /// decision.
    fn update_state(&self, inner: &mut Inner) {
        let now = self.clock.now();
        inner.evict_expired(now, self.config.window_duration);

        match inner.state {
            CircuitState::Open => {
                if let Some(until) = inner.open_until {
                    if now >= until {
                        inner.state = CircuitState::HalfOpen;
                        inner.half_open_successes = 0;
                        inner.half_open_entered_at = Some(now);
                        inner.half_open_probe_in_flight = false;
                    }
                }
            }
            CircuitState::HalfOpen => {
                if let Some(entered) = inner.half_open_entered_at {
                    let deadline = entered + self.config.open_duration;
                    if now >= deadline && !inner.half_open_probe_in_flight {
                        // No probe ever resolved within the dwell window;
                        // give up and reopen for a fresh cooldown.
                        inner.state = CircuitState::Open;
                        inner.open_until = Some(now + self.config.open_duration);
                        inner.half_open_entered_at = None;
                    }
                }
            }
            CircuitState::Closed => {}
        }
    }

    /// Admit a call, or reject with `CircuitOpen`/probe-busy.
    /// Returns whether this admission is the HalfOpen probe.
    async fn admit(&self) -> Result<bool, ResilienceError> {
        let mut inner = self.inner.lock().await;
        self.update_state(&mut inner);

        match inner.state {
            CircuitState::Closed => {
                inner.total_calls += 1;
                Ok(false)
            }
            CircuitState::Open => Err(ResilienceError::CircuitOpen),
            CircuitState::HalfOpen => {
                if inner.half_open_probe_in_flight {
                    Err(ResilienceError::CircuitOpen)
                } else {
                    inner.half_open_probe_in_flight = true;
                    Ok(true)
                }
            }
        }
    }

    async fn on_success(&self, was_probe: bool) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => {
                // A success in Closed does not clear the sliding failure
                // window; only time-based eviction does.
            }
            CircuitState::HalfOpen => {
                inner.half_open_probe_in_flight = false;
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.close_after_successes {
                    inner.state = CircuitState::Closed;
                    inner.open_until = None;
                    inner.half_open_entered_at = None;
                    inner.reset_counters();
                }
            }
            CircuitState::Open => {
                if was_probe {
                    inner.half_open_probe_in_flight = false;
                }
            }
        }
    }

    async fn on_failure(&self, error: &ResilienceError) {
        if !(self.config.counts_as_failure)(error) {
            return;
        }
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;

        match inner.state {
            CircuitState::Closed => {
                inner.failures.push_back(FailureRecord {
                    at: now,
                    kind: error.failure_kind(),
                });
                if inner.failures.len() > MAX_FAILURE_RING {
                    inner.failures.pop_front();
                }
                inner.evict_expired(now, self.config.window_duration);

                if inner.total_calls >= self.config.min_request_volume
                    && inner.failures.len() >= self.config.open_after_failures
                {
                    inner.state = CircuitState::Open;
                    inner.open_until = Some(now + self.config.open_duration);
                }
            }
            CircuitState::HalfOpen => {
                inner.half_open_probe_in_flight = false;
                inner.state = CircuitState::Open;
                inner.open_until = Some(now + self.config.open_duration);
                inner.half_open_entered_at = None;
            }
            CircuitState::Open => {}
        }
    }

    /// Execute `op` under circuit-breaker protection, with no retries.
    ///
    /// Rejects immediately with [`ResilienceError::CircuitOpen`] while
    /// Open, admits exactly one probe while HalfOpen, and flows freely
    /// while Closed.
    pub async fn call<F, Fut, T>(&self, op: F) -> Result<T, ResilienceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ResilienceError>>,
    {
        let was_probe = self.admit().await?;

        match op().await {
            Ok(value) => {
                self.on_success(was_probe).await;
                Ok(value)
            }
            Err(e) => {
                self.on_failure(&e).await;
                Err(e)
            }
        }
    }

    /// Like [`CircuitBreaker::call`], but on rejection (circuit Open or
    /// HalfOpen probe busy) runs `fallback` instead of propagating
    /// `CircuitOpen`. Fallback failures surface with their own kind and
    /// do not re-enter the breaker's counters.
    pub async fn call_or_fallback<F, Fut, Fb, FbFut, T>(
        &self,
        op: F,
        fallback: Fb,
    ) -> Result<T, ResilienceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ResilienceError>>,
        Fb: FnOnce() -> FbFut,
        FbFut: std::future::Future<Output = Result<T, ResilienceError>>,
    {
        match self.call(op).await {
            Err(ResilienceError::CircuitOpen) => fallback().await,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;

    fn breaker(config: CircuitBreakerConfig, clock: Arc<TestClock>) -> CircuitBreaker {
        CircuitBreaker::with_clock("dep", config, clock)
    }

    #[tokio::test]
    async fn stays_closed_below_min_request_volume() {
        let clock = Arc::new(TestClock::new());
        let cb = breaker(
            CircuitBreakerConfig {
                open_after_failures: 3,
                min_request_volume: 10,
                ..Default::default()
            },
            clock,
        );

        for _ in 0..9 {
            let _: Result<(), ResilienceError> =
                cb.call(|| async { Err(ResilienceError::transient("x")) }).await;
        }
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn open_halfopen_close_cycle() {
        let clock = Arc::new(TestClock::new());
        let cb = breaker(
            CircuitBreakerConfig {
                open_after_failures: 3,
                close_after_successes: 2,
                open_duration: Duration::from_secs(1),
                min_request_volume: 3,
                ..Default::default()
            },
            clock.clone(),
        );

        for _ in 0..3 {
            let _: Result<(), ResilienceError> =
                cb.call(|| async { Err(ResilienceError::transient("x")) }).await;
        }
        assert_eq!(cb.state().await, CircuitState::Open);

        clock.advance(Duration::from_millis(1100));
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        let r: Result<(), ResilienceError> = cb.call(|| async { Ok(()) }).await;
        assert!(r.is_ok());
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        let r: Result<(), ResilienceError> = cb.call(|| async { Ok(()) }).await;
        assert!(r.is_ok());
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn halfopen_failure_reopens() {
        let clock = Arc::new(TestClock::new());
        let cb = breaker(
            CircuitBreakerConfig {
                open_after_failures: 1,
                min_request_volume: 1,
                open_duration: Duration::from_secs(1),
                ..Default::default()
            },
            clock.clone(),
        );

        let _: Result<(), ResilienceError> =
            cb.call(|| async { Err(ResilienceError::transient("x")) }).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        clock.advance(Duration::from_millis(1100));
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        let _: Result<(), ResilienceError> = cb
            .call(|| async { Err(ResilienceError::transient("probe failed")) })
            .await;
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn open_rejects_every_call() {
        let clock = Arc::new(TestClock::new());
        let cb = breaker(
            CircuitBreakerConfig {
                open_after_failures: 1,
                min_request_volume: 1,
                open_duration: Duration::from_secs(60),
                ..Default::default()
            },
            clock,
        );

        let _: Result<(), ResilienceError> =
            cb.call(|| async { Err(ResilienceError::transient("x")) }).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        for _ in 0..10 {
            let r: Result<(), ResilienceError> = cb.call(|| async { Ok(()) }).await;
            assert!(matches!(r, Err(ResilienceError::CircuitOpen)));
        }
    }

    #[tokio::test]
    async fn uncounted_failures_never_trip() {
        let clock = Arc::new(TestClock::new());
        let cb = breaker(
            CircuitBreakerConfig {
                open_after_failures: 2,
                min_request_volume: 1,
                ..Default::default()
            },
            clock,
        );

        for _ in 0..10 {
            let r: Result<(), ResilienceError> = cb
                .call(|| async { Err(ResilienceError::permanent("bad request")) })
                .await;
            assert!(r.is_err());
        }
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn fallback_runs_only_when_rejected() {
        let clock = Arc::new(TestClock::new());
        let cb = breaker(
            CircuitBreakerConfig {
                open_after_failures: 1,
                min_request_volume: 1,
                open_duration: Duration::from_secs(60),
                ..Default::default()
            },
            clock,
        );

        let _: Result<(), ResilienceError> =
            cb.call(|| async { Err(ResilienceError::transient("x")) }).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        let r = cb
            .call_or_fallback(
                || async { Ok::<_, ResilienceError>(1) },
                || async { Ok::<_, ResilienceError>(42) },
            )
            .await;
        assert_eq!(r.unwrap(), 42);
    }

    #[tokio::test]
    async fn reset_clears_state_and_counters() {
        let clock = Arc::new(TestClock::new());
        let cb = breaker(
            CircuitBreakerConfig {
                open_after_failures: 1,
                min_request_volume: 1,
                ..Default::default()
            },
            clock,
        );

        let _: Result<(), ResilienceError> =
            cb.call(|| async { Err(ResilienceError::transient("x")) }).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        cb.reset().await;
        assert_eq!(cb.state().await, CircuitState::Closed);

        let r: Result<(), ResilienceError> = cb.call(|| async { Ok(()) }).await;
        assert!(r.is_ok());
    }

    #[tokio::test]
    async fn force_open_and_force_closed_then_reset_is_equivalent_to_reset() {
        let clock = Arc::new(TestClock::new());
        let cb = breaker(CircuitBreakerConfig::default(), clock);

        cb.force_open().await;
        cb.force_closed().await;
        cb.reset().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn sliding_window_evicts_old_failures() {
        let clock = Arc::new(TestClock::new());
        let cb = breaker(
            CircuitBreakerConfig {
                open_after_failures: 3,
                min_request_volume: 3,
                window_duration: Duration::from_millis(100),
                ..Default::default()
            },
            clock.clone(),
        );

        let _: Result<(), ResilienceError> =
            cb.call(|| async { Err(ResilienceError::transient("x")) }).await;
        let _: Result<(), ResilienceError> =
            cb.call(|| async { Err(ResilienceError::transient("x")) }).await;

        clock.advance(Duration::from_millis(200));

        let _: Result<(), ResilienceError> =
            cb.call(|| async { Err(ResilienceError::transient("x")) }).await;

        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn only_one_probe_admitted_concurrently_in_half_open() {
        let clock = Arc::new(TestClock::new());
        let cb = breaker(
            CircuitBreakerConfig {
                open_after_failures: 1,
                min_request_volume: 1,
                open_duration: Duration::from_secs(1),
                ..Default::default()
            },
            clock.clone(),
        );

        let _: Result<(), ResilienceError> =
            cb.call(|| async { Err(ResilienceError::transient("x")) }).await;
        clock.advance(Duration::from_millis(1100));
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        let first = cb.admit().await;
        assert!(matches!(first, Ok(true)));
        let second = cb.admit().await;
        assert!(matches!(second, Err(ResilienceError::CircuitOpen)));
    }
}
