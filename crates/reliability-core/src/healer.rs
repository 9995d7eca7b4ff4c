//! Self-Healing Supervisor: retry orchestrator with exponential backoff,
//! pluggable healing strategies, graceful degradation, and dead-letter
//! routing for operations that never recover.
//!
//! Grounded on two teacher pieces: `penalization::PenaltyBox`'s
//! exponential-backoff law (base, cap, jitter range, per-key state) and
//! `dead_letter::DeadLetterQueue` (bounded FIFO, oldest-drop overflow).
//! `execute_with_healing` itself is new -- the teacher only ever inlined
//! retry logic directly inside `CircuitBreaker::execute`; here it is
//! extracted into its own loop so it can drive pluggable
//! [`RecoveryStrategy`] and [`DegradationStrategy`] hooks independently
//! of any particular breaker.

use crate::config::HealerConfig;
use crate::dead_letter::{DeadLetterEntry, DeadLetterQueue, DeadLetterStats, FailureReason};
use crate::error::ResilienceError;
use crate::logger::{LogContext, LogLevel, Logger, NoopLogger};
use rand::Rng;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Why a healing attempt is being made. Drives which built-in
/// [`RecoveryStrategy`] considers itself applicable (§4.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealingReason {
    HealthCheckFailure,
    ServiceUnavailable,
    MemoryLeak,
    ResourceExhaustion,
    HighLoad,
    CapacityExceeded,
    Custom(String),
}

/// Result of running a single recovery strategy. `success` only feeds
/// metrics and logging -- it never causes the healer to retry by
/// itself; the retry loop in [`SelfHealer::execute_with_healing`] does
/// that regardless of what the strategy reports.
#[derive(Debug, Clone)]
pub struct RecoveryResult {
    pub success: bool,
    pub message: String,
    pub data: Option<String>,
}

impl RecoveryResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Fire-and-forget signal that a named component should re-initialize.
/// Consumed by [`RestartStrategy`]. Interface only -- the core has no
/// opinion on what "restart" means for a given component.
pub trait ComponentLifecycle: Send + Sync {
    fn restart(&self, component: &str);
}

/// Fire-and-forget autoscale request, consumed by [`ScaleOutStrategy`]
/// (§6 "Consumed contracts").
pub trait Autoscaler: Send + Sync {
    fn request_scale_out(&self, component: &str);
}

/// A resource pool (or any periodic-sweep owner) that
/// [`ResourceCleanupStrategy`] can trigger. `PoolManager<T>` implements
/// this directly so registering a pool's cleanup is a one-liner
/// regardless of its element type.
#[async_trait::async_trait]
pub trait Sweepable: Send + Sync {
    async fn sweep(&self);
}

#[async_trait::async_trait]
impl<T: Send + 'static> Sweepable for crate::pool::PoolManager<T> {
    async fn sweep(&self) {
        self.health_check(None).await;
    }
}

/// Collaborators a [`RecoveryStrategy`] may reach for while executing.
/// Everything here is optional: a strategy whose dependency was never
/// registered simply reports failure rather than panicking.
pub struct HealingContext {
    pub component: String,
    pub reason: HealingReason,
    pub attempt: u32,
    pub circuit_breakers: Arc<Mutex<std::collections::HashMap<String, crate::circuit_breaker::CircuitBreaker>>>,
    pub sweepers: Arc<Mutex<Vec<Arc<dyn Sweepable>>>>,
    pub lifecycle: Option<Arc<dyn ComponentLifecycle>>,
    pub autoscaler: Option<Arc<dyn Autoscaler>>,
    pub logger: Arc<dyn Logger>,
}

/// A pluggable recovery action (§4.4, §6 `RecoveryStrategy`).
///
/// Strategies are tried in registration order; the first whose
/// `is_applicable` and `can_handle` both return true executes, and no
/// further strategy is consulted for that attempt.
#[async_trait::async_trait]
pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &str;
    fn is_applicable(&self, component: &str, reason: &HealingReason) -> bool;
    fn can_handle(&self, error: &ResilienceError, attempt: u32) -> bool;
    async fn execute(&self, ctx: &HealingContext) -> RecoveryResult;
}

/// Signals the owning component to re-initialize. Applies to
/// `HealthCheckFailure`/`ServiceUnavailable` within the first two
/// attempts.
pub struct RestartStrategy;

#[async_trait::async_trait]
impl RecoveryStrategy for RestartStrategy {
    fn name(&self) -> &str {
        "restart"
    }

    fn is_applicable(&self, _component: &str, reason: &HealingReason) -> bool {
        matches!(
            reason,
            HealingReason::HealthCheckFailure | HealingReason::ServiceUnavailable
        )
    }

    fn can_handle(&self, _error: &ResilienceError, attempt: u32) -> bool {
        attempt <= 2
    }

    async fn execute(&self, ctx: &HealingContext) -> RecoveryResult {
        match &ctx.lifecycle {
            Some(lifecycle) => {
                lifecycle.restart(&ctx.component);
                RecoveryResult::ok(format!("restarted '{}'", ctx.component))
            }
            None => RecoveryResult::failed("no component lifecycle registered"),
        }
    }
}

/// Forces a named circuit breaker back to `Closed`.
pub struct CircuitBreakerResetStrategy;

#[async_trait::async_trait]
impl RecoveryStrategy for CircuitBreakerResetStrategy {
    fn name(&self) -> &str {
        "circuit_breaker_reset"
    }

    fn is_applicable(&self, _component: &str, _reason: &HealingReason) -> bool {
        true
    }

    fn can_handle(&self, error: &ResilienceError, _attempt: u32) -> bool {
        matches!(error, ResilienceError::CircuitOpen)
    }

    async fn execute(&self, ctx: &HealingContext) -> RecoveryResult {
        let breakers = ctx.circuit_breakers.lock().await;
        match breakers.get(&ctx.component) {
            Some(breaker) => {
                breaker.force_closed().await;
                RecoveryResult::ok(format!("forced '{}' closed", ctx.component))
            }
            None => RecoveryResult::failed(format!("no breaker registered for '{}'", ctx.component)),
        }
    }
}

/// Triggers pool sweeps (and, via `data`, logs that a runtime GC hint
/// was requested -- the core has no GC to drive directly). Applies to
/// `MemoryLeak`/`ResourceExhaustion`.
pub struct ResourceCleanupStrategy;

#[async_trait::async_trait]
impl RecoveryStrategy for ResourceCleanupStrategy {
    fn name(&self) -> &str {
        "resource_cleanup"
    }

    fn is_applicable(&self, _component: &str, reason: &HealingReason) -> bool {
        matches!(
            reason,
            HealingReason::MemoryLeak | HealingReason::ResourceExhaustion
        )
    }

    fn can_handle(&self, _error: &ResilienceError, _attempt: u32) -> bool {
        true
    }

    async fn execute(&self, ctx: &HealingContext) -> RecoveryResult {
        let sweepers = ctx.sweepers.lock().await;
        for sweeper in sweepers.iter() {
            sweeper.sweep().await;
        }
        RecoveryResult::ok(format!("swept {} pool(s)", sweepers.len()))
    }
}

/// Signals an external autoscaler. Applies to `HighLoad`/`CapacityExceeded`
/// from the second attempt onward (the first attempt is given a chance
/// to clear on its own before paying for new capacity).
pub struct ScaleOutStrategy;

#[async_trait::async_trait]
impl RecoveryStrategy for ScaleOutStrategy {
    fn name(&self) -> &str {
        "scale_out"
    }

    fn is_applicable(&self, _component: &str, reason: &HealingReason) -> bool {
        matches!(
            reason,
            HealingReason::HighLoad | HealingReason::CapacityExceeded
        )
    }

    fn can_handle(&self, _error: &ResilienceError, attempt: u32) -> bool {
        attempt >= 2
    }

    async fn execute(&self, ctx: &HealingContext) -> RecoveryResult {
        match &ctx.autoscaler {
            Some(autoscaler) => {
                autoscaler.request_scale_out(&ctx.component);
                RecoveryResult::ok(format!("requested scale-out for '{}'", ctx.component))
            }
            None => RecoveryResult::failed("no autoscaler registered"),
        }
    }
}

/// Reversible reduced-functionality mode entered when no strategy clears
/// the failure and degradation is enabled (§4.4, §6 `DegradationStrategy`).
#[async_trait::async_trait]
pub trait DegradationStrategy: Send + Sync {
    async fn enable(&self, component: &str, reason: &str);
    async fn disable(&self, component: &str);
}

/// Cooperative cancellation signal for retry sleeps. Distinct from a
/// per-call deadline: this is the "global cancellation signal" §4.4
/// requires sleeps to respect, shared across every in-flight healer
/// invocation.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves immediately if already cancelled; otherwise waits for
    /// the next [`CancellationToken::cancel`] call.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Exponential backoff with an upper cap, per §4.4: `min(base^(attempt-1),
/// cap)` seconds, optionally jittered into `[0.5, 1.5)×` to avoid
/// thundering herds. `attempt` is 1-indexed (the count of failures seen
/// so far).
pub fn exponential_backoff(attempt: u32, base_secs: u64, cap_secs: u64, jitter: bool) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let raw = (base_secs as f64).powi(exponent as i32);
    let capped = raw.min(cap_secs as f64);
    let factor = if jitter {
        rand::rng().random_range(0.5..1.5)
    } else {
        1.0
    };
    Duration::from_secs_f64((capped * factor).max(0.0))
}

/// Retry orchestrator: exponential backoff, pluggable healing
/// strategies, graceful degradation, and a dead-letter queue for
/// operations that exhaust every retry (§4.4).
pub struct SelfHealer {
    config: HealerConfig,
    logger: Arc<dyn Logger>,
    strategies: Vec<Arc<dyn RecoveryStrategy>>,
    degradation: Option<Arc<dyn DegradationStrategy>>,
    circuit_breakers: Arc<Mutex<std::collections::HashMap<String, crate::circuit_breaker::CircuitBreaker>>>,
    sweepers: Arc<Mutex<Vec<Arc<dyn Sweepable>>>>,
    lifecycle: Option<Arc<dyn ComponentLifecycle>>,
    autoscaler: Option<Arc<dyn Autoscaler>>,
    dlq: Arc<Mutex<DeadLetterQueue>>,
    degraded: Arc<Mutex<HashSet<String>>>,
    cancellation: CancellationToken,
}

/// Builder-style construction: register strategies and collaborators
/// before calling [`SelfHealerBuilder::build`].
pub struct SelfHealerBuilder {
    config: HealerConfig,
    logger: Arc<dyn Logger>,
    strategies: Vec<Arc<dyn RecoveryStrategy>>,
    degradation: Option<Arc<dyn DegradationStrategy>>,
    lifecycle: Option<Arc<dyn ComponentLifecycle>>,
    autoscaler: Option<Arc<dyn Autoscaler>>,
}

impl SelfHealerBuilder {
    pub fn new(config: HealerConfig) -> Self {
        Self {
            config,
            logger: Arc::new(NoopLogger),
            strategies: Vec::new(),
            degradation: None,
            lifecycle: None,
            autoscaler: None,
        }
    }

    /// Register the four built-in strategies in the order §4.4 lists
    /// them: Restart, CircuitBreakerReset, ResourceCleanup, ScaleOut.
    pub fn with_default_strategies(mut self) -> Self {
        self.strategies.push(Arc::new(RestartStrategy));
        self.strategies.push(Arc::new(CircuitBreakerResetStrategy));
        self.strategies.push(Arc::new(ResourceCleanupStrategy));
        self.strategies.push(Arc::new(ScaleOutStrategy));
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn RecoveryStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_degradation(mut self, degradation: Arc<dyn DegradationStrategy>) -> Self {
        self.degradation = Some(degradation);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn ComponentLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn with_autoscaler(mut self, autoscaler: Arc<dyn Autoscaler>) -> Self {
        self.autoscaler = Some(autoscaler);
        self
    }

    pub fn build(self) -> SelfHealer {
        SelfHealer {
            dlq: Arc::new(Mutex::new(DeadLetterQueue::new(self.config.dlq_capacity))),
            config: self.config,
            logger: self.logger,
            strategies: self.strategies,
            degradation: self.degradation,
            circuit_breakers: Arc::new(Mutex::new(std::collections::HashMap::new())),
            sweepers: Arc::new(Mutex::new(Vec::new())),
            lifecycle: self.lifecycle,
            autoscaler: self.autoscaler,
            degraded: Arc::new(Mutex::new(HashSet::new())),
            cancellation: CancellationToken::new(),
        }
    }
}

impl SelfHealer {
    pub fn builder(config: HealerConfig) -> SelfHealerBuilder {
        SelfHealerBuilder::new(config)
    }

    /// Global cancellation signal shared by every retry sleep this
    /// healer drives. Call [`CancellationToken::cancel`] to abort all
    /// in-flight and future healing sleeps cooperatively.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub async fn register_circuit_breaker(&self, name: impl Into<String>, breaker: crate::circuit_breaker::CircuitBreaker) {
        self.circuit_breakers.lock().await.insert(name.into(), breaker);
    }

    pub async fn register_sweeper(&self, sweeper: Arc<dyn Sweepable>) {
        self.sweepers.lock().await.push(sweeper);
    }

    pub async fn is_degraded(&self, component: &str) -> bool {
        self.degraded.lock().await.contains(component)
    }

    pub async fn dlq_stats(&self) -> DeadLetterStats {
        self.dlq.lock().await.stats()
    }

    pub async fn dlq_entries(&self) -> Vec<DeadLetterEntry> {
        self.dlq.lock().await.entries().iter().cloned().collect()
    }

    fn log(&self, level: LogLevel, message: &str, component: &str) {
        let mut ctx = LogContext::new();
        ctx.insert("component", component.to_string());
        self.logger.log(level, message, &ctx);
    }

    /// Run `operation` under retry protection, invoking pluggable
    /// healing strategies between attempts and routing to the
    /// dead-letter queue if every retry is exhausted (§4.4).
    ///
    /// `operation_id` identifies the logical call for the DLQ entry;
    /// `component` and `reason` drive strategy applicability.
    pub async fn execute_with_healing<F, Fut, T>(
        &self,
        operation_id: &str,
        component: &str,
        reason: HealingReason,
        mut operation: F,
    ) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        let max_retries = self.config.max_retries as u32;
        let mut attempts: u32 = 0;
        let mut last_error: Option<ResilienceError> = None;
        let first_failed_at = std::time::SystemTime::now();

        while attempts < max_retries {
            match operation().await {
                Ok(value) => {
                    if attempts > 0 {
                        self.log(LogLevel::Info, "operation recovered after retry", component);
                    }
                    return Ok(value);
                }
                Err(error) => {
                    attempts += 1;

                    if attempts < max_retries {
                        self.run_first_applicable_strategy(component, &reason, &error, attempts)
                            .await;

                        let delay = exponential_backoff(
                            attempts,
                            self.config.backoff.base_secs,
                            self.config.backoff.cap_secs,
                            self.config.backoff.jitter,
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = self.cancellation.cancelled() => {
                                last_error = Some(error);
                                break;
                            }
                        }
                    } else {
                        last_error = Some(error);
                    }
                }
            }
        }

        let last_error = last_error.unwrap_or(ResilienceError::HealingFailed(Box::new(
            ResilienceError::Config("operation never ran".to_string()),
        )));

        if let Some(degradation) = &self.degradation {
            degradation.enable(component, "healing exhausted").await;
            self.degraded.lock().await.insert(component.to_string());
        }

        let entry = DeadLetterEntry {
            operation_id: operation_id.to_string(),
            input_digest: None,
            config_snapshot: format!(
                "max_retries={}, backoff_base={}s, backoff_cap={}s",
                self.config.max_retries, self.config.backoff.base_secs, self.config.backoff.cap_secs
            ),
            failure_reason: FailureReason::RetriesExhausted { attempts },
            last_error: last_error.to_string(),
            first_failed_at,
            last_failed_at: std::time::SystemTime::now(),
        };
        self.dlq.lock().await.push(entry);
        self.log(LogLevel::Error, "operation exhausted retries, dead-lettered", component);

        Err(ResilienceError::HealingFailed(Box::new(last_error)))
    }

    /// Mark a previously degraded component recovered. Reverses
    /// [`SelfHealer::execute_with_healing`]'s degradation entry.
    pub async fn clear_degraded(&self, component: &str) {
        if let Some(degradation) = &self.degradation {
            degradation.disable(component).await;
        }
        self.degraded.lock().await.remove(component);
    }

    async fn run_first_applicable_strategy(
        &self,
        component: &str,
        reason: &HealingReason,
        error: &ResilienceError,
        attempt: u32,
    ) {
        for strategy in &self.strategies {
            if strategy.is_applicable(component, reason) && strategy.can_handle(error, attempt) {
                let ctx = HealingContext {
                    component: component.to_string(),
                    reason: reason.clone(),
                    attempt,
                    circuit_breakers: self.circuit_breakers.clone(),
                    sweepers: self.sweepers.clone(),
                    lifecycle: self.lifecycle.clone(),
                    autoscaler: self.autoscaler.clone(),
                    logger: self.logger.clone(),
                };
                let result = strategy.execute(&ctx).await;
                self.log(
                    if result.success { LogLevel::Info } else { LogLevel::Warning },
                    &format!("strategy '{}': {}", strategy.name(), result.message),
                    component,
                );
                return;
            }
        }
    }
}
