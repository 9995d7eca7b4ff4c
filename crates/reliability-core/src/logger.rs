//! Logger contract consumed by the Reliability Core (§6).
//!
//! The core never depends on a concrete logging backend. [`Logger`] is
//! the capability contract; [`TracingLogger`] is the default
//! implementation, forwarding to the `tracing` crate's `event!` macros
//! the same way the host application's own `tracing-subscriber` setup
//! does. [`NoopLogger`] is used where tests don't care about log output.

use std::collections::BTreeMap;
use std::fmt;

/// Log severity, ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

/// Structured context attached to a log line. Kept as an ordered map so
/// output is stable across calls (useful for golden-file assertions in
/// host applications).
pub type LogContext = BTreeMap<&'static str, String>;

/// A structured logging sink.
///
/// `log` MUST be non-throwing: a logging failure (e.g. a backend that is
/// temporarily unavailable) must never propagate into the caller's
/// control flow. Implementations that write to fallible sinks should
/// swallow and, at most, increment an internal error counter.
pub trait Logger: Send + Sync + fmt::Debug {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext);

    /// Convenience wrapper building a one-entry context. Bounded by
    /// `Self: Sized` so the generic parameter doesn't block `dyn Logger`
    /// object safety -- callers holding a trait object use [`Logger::log`]
    /// directly instead.
    fn log_kv(&self, level: LogLevel, message: &str, key: &'static str, value: impl ToString)
    where
        Self: Sized,
    {
        let mut ctx = LogContext::new();
        ctx.insert(key, value.to_string());
        self.log(level, message, &ctx);
    }
}

/// Default [`Logger`] forwarding to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext) {
        match level {
            LogLevel::Debug => tracing::debug!(?context, "{message}"),
            LogLevel::Info => tracing::info!(?context, "{message}"),
            LogLevel::Warning => tracing::warn!(?context, "{message}"),
            LogLevel::Error => tracing::error!(?context, "{message}"),
            LogLevel::Critical => tracing::error!(critical = true, ?context, "{message}"),
        }
    }
}

/// A [`Logger`] that discards everything. Useful as a default in tests
/// and benchmarks that don't assert on log output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str, _context: &LogContext) {}
}
