//! Reliability Core: pure-logic fault tolerance primitives.
//!
//! # Overview
//!
//! This crate is the shared Reliability Core behind a high-concurrency
//! application runtime: four tightly-coupled subsystems that keep a
//! fleet of request-handling workers alive under load while shielding
//! downstream dependencies from cascading failure.
//!
//! - **Circuit Breaker** ([`circuit_breaker`]): per-dependency three-state
//!   fault isolation (Closed/Open/HalfOpen).
//! - **Bulkhead** ([`bulkhead`]): per-service concurrency ceiling with a
//!   FIFO wait queue.
//! - **Self-Healing Supervisor** ([`healer`]): retry with exponential
//!   backoff, pluggable healing strategies, graceful degradation, and a
//!   dead-letter queue ([`dead_letter`]).
//! - **Resource Pool Manager** ([`pool`]): generic connection/object
//!   pools with acquire/release/validate/evict discipline.
//!
//! [`health_monitor`] observes all four; [`clock`], [`logger`], and
//! [`config`] are the shared runtime glue they lean on.
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of wire protocols,
//! routers, serializers, cluster membership, or any concrete logging,
//! metrics, or config-loading backend. It exposes capability traits at
//! those seams ([`logger::Logger`], [`clock::Clock`],
//! [`healer::Autoscaler`], [`healer::ComponentLifecycle`],
//! [`health_monitor::HealthChecker`]) so a host application wires in its
//! own collaborators without this crate depending on any of them.
//!
//! # Usage Example
//!
//! ## Circuit breaker wrapping a call
//!
//! ```ignore
//! use reliability_core::{CircuitBreaker, CircuitBreakerConfig, ResilienceError};
//!
//! # async fn example() -> Result<(), ResilienceError> {
//! let breaker = CircuitBreaker::new("payments", CircuitBreakerConfig::default());
//!
//! let result = breaker.call(|| async {
//!     Ok::<_, ResilienceError>(42)
//! }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Resource pool
//!
//! ```ignore
//! use reliability_core::pool::{Pool, ResourceFactory};
//! use reliability_core::config::PoolConfig;
//! use reliability_core::ResilienceError;
//! use std::sync::Arc;
//!
//! # struct MyConnection;
//! struct MyConnectionFactory;
//!
//! #[async_trait::async_trait]
//! impl ResourceFactory<MyConnection> for MyConnectionFactory {
//!     async fn create(&self) -> Result<MyConnection, ResilienceError> {
//! #       Ok(MyConnection)
//!     }
//! }
//!
//! # async fn example() -> Result<(), ResilienceError> {
//! let pool = Pool::new("db", Arc::new(MyConnectionFactory), PoolConfig::default(), None, None);
//! let conn = pool.acquire(None).await?;
//! pool.release(conn).await;
//! # Ok(())
//! # }
//! ```

pub mod bulkhead;
pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod dead_letter;
pub mod error;
pub mod healer;
pub mod health_monitor;
pub mod logger;
pub mod pool;

pub use bulkhead::{Bulkhead, BulkheadPermit, BulkheadStats};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use clock::{Clock, SystemClock, TestClock};
pub use config::ReliabilityConfig;
pub use dead_letter::{DeadLetterEntry, DeadLetterQueue, DeadLetterStats, FailureReason};
pub use error::{FailureKind, ResilienceError};
pub use healer::{HealingReason, RecoveryResult, RecoveryStrategy, SelfHealer, SelfHealerBuilder};
pub use health_monitor::{HealthChecker, HealthMonitor, HealthRecord, HealthStatus, OverallHealth};
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use pool::{Pool, PoolManager, PoolStats};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use reliability_core::prelude::*;
/// ```
pub mod prelude {
    pub use super::bulkhead::{Bulkhead, BulkheadPermit};
    pub use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
    pub use super::error::ResilienceError;
    pub use super::healer::SelfHealer;
    pub use super::health_monitor::HealthMonitor;
    pub use super::pool::{Pool, PoolManager};
}
