//! Configuration surface for the Reliability Core.
//!
//! Mirrors the teacher's `orbit-sentinel::SentinelPolicy` convention: a
//! serde-derived struct per component with a `Default` impl matching the
//! documented defaults and a `validate()` method returning a descriptive
//! error. Loading these from a file or environment is a host
//! application's job; this crate only defines and validates the shape.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_duration_secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

/// Pool sizing and eviction policy for a named [`crate::pool::Pool`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub min_size: usize,
    pub max_size: usize,
    pub strategy: PoolStrategy,
    #[serde(with = "duration_secs")]
    pub max_idle_age: Duration,
    #[serde(with = "duration_secs")]
    pub max_lifetime: Duration,
    #[serde(with = "duration_secs")]
    pub acquire_timeout: Duration,
}

/// Resource-selection strategy on release/acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStrategy {
    /// Most-recently-released resource is handed out first.
    Lifo,
    /// Least-recently-released resource is handed out first.
    Fifo,
    /// Least-recently-used resource (by last successful acquire) is evicted first.
    Lru,
}

impl Default for PoolStrategy {
    fn default() -> Self {
        PoolStrategy::Lifo
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: 5,
            max_size: 100,
            strategy: PoolStrategy::Lifo,
            max_idle_age: default_duration_secs(300),
            max_lifetime: default_duration_secs(3600),
            acquire_timeout: default_duration_secs(30),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_size == 0 {
            return Err("pool max_size must be at least 1".to_string());
        }
        if self.min_size > self.max_size {
            return Err("pool min_size must not exceed max_size".to_string());
        }
        Ok(())
    }
}

/// Circuit breaker configuration surface. This mirrors
/// [`crate::circuit_breaker::CircuitBreakerConfig`] but stays a plain,
/// serde-friendly value type (it has no `counts_as_failure` closure
/// field) so it can be loaded and validated before a breaker is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub open_after_failures: usize,
    pub close_after_successes: usize,
    #[serde(with = "duration_secs")]
    pub open_duration: Duration,
    pub min_request_volume: usize,
    #[serde(with = "duration_secs")]
    pub window_duration: Duration,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            open_after_failures: 5,
            close_after_successes: 3,
            open_duration: default_duration_secs(60),
            min_request_volume: 10,
            window_duration: default_duration_secs(300),
        }
    }
}

impl CircuitBreakerSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.open_after_failures == 0 {
            return Err("open_after_failures must be at least 1".to_string());
        }
        if self.close_after_successes == 0 {
            return Err("close_after_successes must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn into_breaker_config(self) -> crate::circuit_breaker::CircuitBreakerConfig {
        crate::circuit_breaker::CircuitBreakerConfig {
            open_after_failures: self.open_after_failures,
            close_after_successes: self.close_after_successes,
            open_duration: self.open_duration,
            min_request_volume: self.min_request_volume,
            window_duration: self.window_duration,
            counts_as_failure: std::sync::Arc::new(crate::error::ResilienceError::should_trip_breaker),
        }
    }
}

/// Bulkhead configuration surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkheadConfig {
    pub max_concurrent: usize,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self { max_concurrent: 10 }
    }
}

impl BulkheadConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("bulkhead max_concurrent must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Backoff policy for the self-healing retry loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Base delay in seconds before exponentiation.
    pub base_secs: u64,
    /// Upper bound on any single sleep, in seconds.
    pub cap_secs: u64,
    /// Whether to apply jitter in [0.5, 1.5) to each computed delay.
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_secs: 2,
            cap_secs: 60,
            jitter: true,
        }
    }
}

/// Self-healing supervisor configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealerConfig {
    pub max_retries: usize,
    pub backoff: BackoffConfig,
    pub dlq_capacity: usize,
}

impl Default for HealerConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: BackoffConfig::default(),
            dlq_capacity: 1000,
        }
    }
}

impl HealerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries == 0 {
            return Err("healer max_retries must be at least 1".to_string());
        }
        if self.backoff.base_secs == 0 {
            return Err("healer backoff base_secs must be at least 1".to_string());
        }
        if self.dlq_capacity == 0 {
            return Err("healer dlq_capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Health monitor configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    #[serde(with = "duration_secs")]
    pub check_interval: Duration,
    pub five_nines_threshold: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval: default_duration_secs(30),
            five_nines_threshold: 99.999,
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.five_nines_threshold) {
            return Err("five_nines_threshold must be between 0 and 100".to_string());
        }
        Ok(())
    }
}

/// Top-level configuration tree for the Reliability Core. Per-name pool
/// and circuit breaker overrides are intentionally absent here -- the
/// `{name}`-keyed entries in the design table are modeled by calling
/// `PoolManager::create_pool`/`CircuitBreaker::new` with a distinct
/// [`PoolConfig`]/[`CircuitBreakerSettings`] per name, not by a nested
/// map in this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    pub pool: PoolConfig,
    pub circuit_breaker: CircuitBreakerSettings,
    pub bulkhead: BulkheadConfig,
    pub healer: HealerConfig,
    pub health: HealthConfig,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            bulkhead: BulkheadConfig::default(),
            healer: HealerConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl ReliabilityConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.pool.validate()?;
        self.circuit_breaker.validate()?;
        self.bulkhead.validate()?;
        self.healer.validate()?;
        self.health.validate()?;
        Ok(())
    }
}

/// `serde(with = ...)` helper for `Duration` fields stored as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
