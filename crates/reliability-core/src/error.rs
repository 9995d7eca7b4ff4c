//! Error taxonomy for the Reliability Core
//!
//! Every recoverable or terminal condition the core can surface is a
//! variant of [`ResilienceError`]. Call sites distinguish transient from
//! permanent failure through `is_transient`/`is_permanent`, and the
//! circuit breaker decides whether an error should count toward tripping
//! via `should_trip_breaker` / [`FailureKind`].

use std::time::Duration;
use thiserror::Error;

/// Classification of an [`ResilienceError::OperationFailure`], used by the
/// circuit breaker to decide whether the error counts toward tripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Expected to clear on retry (timeouts, connection resets, 5xx-style
    /// downstream errors). Counts toward the breaker's failure window.
    Transient,
    /// Not expected to clear on retry (validation errors, 4xx-style
    /// downstream errors). Propagates to the caller but never trips the
    /// breaker.
    Permanent,
}

/// Errors surfaced by the Reliability Core.
///
/// Variants map directly to §7 of the design: `CircuitOpen`,
/// `CapacityExceeded`, `TimedOut`, `PoolClosed`, `ResourceUnhealthy`,
/// `OperationFailure`, `HealingFailed`, and `DegradedMode`.
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// The circuit breaker rejected the call without running it.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The bulkhead has no free slot and the caller asked to fail fast.
    #[error("bulkhead capacity exceeded")]
    CapacityExceeded,

    /// A wait (pool acquire, bulkhead admission, breaker probe) exceeded
    /// its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The pool has been closed and is no longer serving acquisitions.
    #[error("pool is closed")]
    PoolClosed,

    /// A resource failed validation or its health-checker; the core
    /// destroyed it and the caller should retry the acquisition.
    #[error("resource is unhealthy: {0}")]
    ResourceUnhealthy(String),

    /// A downstream operation failed. `kind` determines whether this
    /// counts toward the circuit breaker's failure window (§4.2,
    /// "Counted failures").
    #[error("operation failed: {message}")]
    OperationFailure {
        kind: FailureKind,
        message: String,
    },

    /// All healing attempts were exhausted; the original error is chained.
    #[error("healing failed after exhausting retries: {0}")]
    HealingFailed(#[source] Box<ResilienceError>),

    /// Informational: the named component is currently in degraded mode.
    #[error("component '{0}' is in degraded mode")]
    DegradedMode(String),

    /// A configuration value was invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ResilienceError {
    /// Construct a transient operation failure.
    pub fn transient<S: Into<String>>(message: S) -> Self {
        ResilienceError::OperationFailure {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    /// Construct a permanent operation failure.
    pub fn permanent<S: Into<String>>(message: S) -> Self {
        ResilienceError::OperationFailure {
            kind: FailureKind::Permanent,
            message: message.into(),
        }
    }

    /// Whether this error is expected to clear on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ResilienceError::OperationFailure {
                kind: FailureKind::Transient,
                ..
            } | ResilienceError::ResourceUnhealthy(_)
                | ResilienceError::Timeout(_)
        )
    }

    /// Whether this error should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ResilienceError::OperationFailure {
                kind: FailureKind::Permanent,
                ..
            } | ResilienceError::PoolClosed
        )
    }

    /// Whether this error should count against a circuit breaker's
    /// failure threshold (§4.2: only counted-kind operation failures and
    /// unhealthy-resource signals trip the breaker; admission-control
    /// errors like `CircuitOpen`/`CapacityExceeded` never do).
    pub fn should_trip_breaker(&self) -> bool {
        matches!(
            self,
            ResilienceError::OperationFailure {
                kind: FailureKind::Transient,
                ..
            } | ResilienceError::ResourceUnhealthy(_)
                | ResilienceError::Timeout(_)
        )
    }

    /// The `FailureKind` the circuit breaker's recent-failures ring should
    /// tag this error with (§3: "ring of recent failure records
    /// (timestamp, error kind)"). `OperationFailure` carries its own kind;
    /// `ResourceUnhealthy`/`Timeout` are treated as transient the same way
    /// `should_trip_breaker` does, since both clear once the underlying
    /// resource or dependency recovers.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ResilienceError::OperationFailure { kind, .. } => *kind,
            ResilienceError::ResourceUnhealthy(_) | ResilienceError::Timeout(_) => {
                FailureKind::Transient
            }
            _ => FailureKind::Permanent,
        }
    }
}
