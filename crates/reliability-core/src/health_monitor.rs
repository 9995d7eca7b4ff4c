//! Health Monitor: aggregates component health across the core and
//! surfaces it through a flat metrics map and status-change callbacks
//! (§4.5).
//!
//! This is a redesign, not a generalization, of the teacher's
//! `HealthMonitor`: the teacher's version is a single-purpose disk/
//! throughput advisory generator fed one `HealthSample` at a time for a
//! single transfer job. `spec.md` §4.5 wants a component-aggregating
//! rollup over many registered checkers with a five-nines compliance
//! flag. What carries over directly is the teacher's shape -- a pure
//! state machine fed by samples, a bounded history ring, a `stats()`
//! accessor -- just re-pointed at a different aggregate: `check()`
//! becomes [`HealthMonitor::perform_health_check`], `Advisory` becomes
//! the per-component [`HealthStatus`], and the teacher's bounded
//! `VecDeque<(Instant, u64)>` disk history becomes the bounded
//! [`HealthSample`] ring this module keeps.

use crate::clock::{Clock, SystemClock};
use crate::config::HealthConfig;
use crate::logger::{LogContext, LogLevel, Logger, NoopLogger};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use sysinfo::{Disks, System};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Coarse status band for a single component (§3 `HealthSample`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    Healthy,
    Elevated,
    Warning,
    Critical,
    Error,
}

impl HealthStatus {
    fn is_healthy(self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// One checker's report: a status band, a simplified healthy flag, and
/// whatever numeric metrics it wants to export.
#[derive(Debug, Clone)]
pub struct HealthRecord {
    pub status: HealthStatus,
    pub healthy: bool,
    pub metrics: HashMap<String, f64>,
    pub details: HashMap<String, String>,
}

impl HealthRecord {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            healthy: true,
            metrics: HashMap::new(),
            details: HashMap::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let mut details = HashMap::new();
        details.insert("error".to_string(), message.into());
        Self {
            status: HealthStatus::Error,
            healthy: false,
            metrics: HashMap::new(),
            details,
        }
    }
}

/// A registered health source. Implementations correspond to the
/// "duck-typed checker" collaborators §9 replaces with an explicit
/// capability contract: a caller registers via
/// [`HealthMonitor::register_component_monitor`] rather than the core
/// reflecting over a class name.
#[async_trait::async_trait]
pub trait HealthChecker: Send + Sync {
    async fn check(&self) -> HealthRecord;
    async fn metrics(&self) -> HashMap<String, f64>;
}

/// Registered via [`HealthMonitor::register_hook`]; fired on every
/// status transition the monitor observes. Per §4.5, a panicking hook
/// must not take down the check loop -- panics are caught and logged.
pub trait HealthIntegrationHooks: Send + Sync {
    fn on_status_change(&self, component: &str, old: HealthStatus, new: HealthStatus) {
        let _ = (component, old, new);
    }
    fn on_failure_detected(&self, component: &str, record: &HealthRecord) {
        let _ = (component, record);
    }
    fn on_recovery_confirmed(&self, component: &str, record: &HealthRecord) {
        let _ = (component, record);
    }
}

/// A timestamped snapshot across every registered component (§3).
#[derive(Debug, Clone)]
pub struct HealthSample {
    pub at: SystemTime,
    pub components: HashMap<String, HealthRecord>,
}

/// Five-nines-style status band derived from the healthy/total ratio
/// (§4.5 "Overall status").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    Excellent,
    Good,
    Degraded,
    Poor,
    Critical,
}

impl OverallStatus {
    fn from_rate(rate: f64) -> Self {
        if rate >= 99.999 {
            OverallStatus::Excellent
        } else if rate >= 99.9 {
            OverallStatus::Good
        } else if rate >= 95.0 {
            OverallStatus::Degraded
        } else if rate >= 50.0 {
            OverallStatus::Poor
        } else {
            OverallStatus::Critical
        }
    }
}

/// Aggregate health across every registered component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverallHealth {
    pub healthy_components: usize,
    pub total_components: usize,
    pub health_percentage: f64,
    pub five_nines_compliance: bool,
    pub status: OverallStatus,
}

/// Built-in checker a host registers like any other via
/// [`HealthMonitor::register_component_monitor`]: process memory against
/// a configured cap, load average, free disk on a data directory, and
/// the crate's runtime version (§4.5 "system-level probes"). Grounded on
/// the teacher root binary's `sysinfo` usage
/// (`src/main.rs`, `src/core/probe.rs`): `System::new_all()` +
/// `available_memory()`/`total_memory()`, `Disks::new_with_refreshed_list()`
/// + `available_space()`.
pub struct SystemProbe {
    data_dir: PathBuf,
    memory_cap_bytes: Option<u64>,
}

impl SystemProbe {
    pub fn new(data_dir: impl Into<PathBuf>, memory_cap_bytes: Option<u64>) -> Self {
        Self {
            data_dir: data_dir.into(),
            memory_cap_bytes,
        }
    }
}

#[async_trait::async_trait]
impl HealthChecker for SystemProbe {
    async fn check(&self) -> HealthRecord {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let used_memory = sys.used_memory();
        let total_memory = sys.total_memory();

        let disks = Disks::new_with_refreshed_list();
        let free_disk = disks
            .iter()
            .filter(|disk| self.data_dir.starts_with(disk.mount_point()))
            .map(|disk| disk.available_space())
            .max()
            .unwrap_or(0);

        let load = System::load_average();

        let mut metrics = HashMap::new();
        metrics.insert("process_memory_used_bytes".to_string(), used_memory as f64);
        metrics.insert("system_total_memory_bytes".to_string(), total_memory as f64);
        metrics.insert("free_disk_bytes".to_string(), free_disk as f64);
        metrics.insert("load_average_1".to_string(), load.one);
        metrics.insert("load_average_5".to_string(), load.five);
        metrics.insert("load_average_15".to_string(), load.fifteen);

        let mut details = HashMap::new();
        details.insert("runtime_version".to_string(), env!("CARGO_PKG_VERSION").to_string());

        let over_cap = self
            .memory_cap_bytes
            .map(|cap| used_memory > cap)
            .unwrap_or(false);

        let status = if over_cap {
            HealthStatus::Critical
        } else if free_disk < 100 * 1024 * 1024 {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        HealthRecord {
            healthy: status.is_healthy() || status == HealthStatus::Warning,
            status,
            metrics,
            details,
        }
    }

    async fn metrics(&self) -> HashMap<String, f64> {
        self.check().await.metrics
    }
}

struct CheckerEntry {
    checker: Arc<dyn HealthChecker>,
}

/// Aggregates component health, surfaces a flat metrics map, and fires
/// status-change callbacks (§4.5).
pub struct HealthMonitor {
    config: HealthConfig,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    checkers: RwLock<HashMap<String, CheckerEntry>>,
    last_status: RwLock<HashMap<String, HealthStatus>>,
    history: RwLock<std::collections::VecDeque<HealthSample>>,
    history_capacity: usize,
    hooks: RwLock<Vec<Arc<dyn HealthIntegrationHooks>>>,
    running: Arc<AtomicBool>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        Self::with_clock_and_logger(config, Arc::new(SystemClock), Arc::new(NoopLogger))
    }

    pub fn with_clock_and_logger(config: HealthConfig, clock: Arc<dyn Clock>, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            clock,
            logger,
            checkers: RwLock::new(HashMap::new()),
            last_status: RwLock::new(HashMap::new()),
            history: RwLock::new(std::collections::VecDeque::new()),
            history_capacity: 120,
            hooks: RwLock::new(Vec::new()),
            running: Arc::new(AtomicBool::new(false)),
            task: tokio::sync::Mutex::new(None),
        }
    }

    pub async fn register_component_monitor(&self, name: impl Into<String>, checker: Arc<dyn HealthChecker>) {
        self.checkers.write().await.insert(name.into(), CheckerEntry { checker });
    }

    pub async fn unregister_component_monitor(&self, name: &str) {
        self.checkers.write().await.remove(name);
        self.last_status.write().await.remove(name);
    }

    pub async fn register_hook(&self, hook: Arc<dyn HealthIntegrationHooks>) {
        self.hooks.write().await.push(hook);
    }

    /// Walk every registered checker, catching per-checker panics and
    /// turning them into `status=Error, healthy=false` (§4.5), then fire
    /// status-change callbacks for any component whose status changed
    /// since the last check.
    pub async fn perform_health_check(&self) -> HealthSample {
        let checkers: Vec<(String, Arc<dyn HealthChecker>)> = {
            let guard = self.checkers.read().await;
            guard.iter().map(|(k, v)| (k.clone(), v.checker.clone())).collect()
        };

        let mut components = HashMap::new();
        for (name, checker) in checkers {
            let record = match AssertUnwindSafe(checker.check()).catch_unwind().await {
                Ok(record) => record,
                Err(_) => HealthRecord::error("health checker panicked"),
            };
            self.on_component_checked(&name, &record).await;
            components.insert(name, record);
        }

        let sample = HealthSample {
            at: SystemTime::now(),
            components,
        };

        {
            let mut history = self.history.write().await;
            history.push_back(sample.clone());
            while history.len() > self.history_capacity {
                history.pop_front();
            }
        }

        sample
    }

    async fn on_component_checked(&self, name: &str, record: &HealthRecord) {
        let previous = {
            let mut last = self.last_status.write().await;
            let previous = last.get(name).copied();
            last.insert(name.to_string(), record.status);
            previous
        };

        let Some(previous) = previous else {
            return;
        };
        if previous == record.status {
            return;
        }

        let hooks: Vec<Arc<dyn HealthIntegrationHooks>> = self.hooks.read().await.clone();
        for hook in &hooks {
            let hook = hook.clone();
            let name = name.to_string();
            let record = record.clone();
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                hook.on_status_change(&name, previous, record.status);
                if !record.healthy {
                    hook.on_failure_detected(&name, &record);
                } else if !previous.is_healthy() {
                    hook.on_recovery_confirmed(&name, &record);
                }
            }));
            if result.is_err() {
                let mut ctx = LogContext::new();
                ctx.insert("component", name.clone());
                self.logger.log(LogLevel::Error, "health integration hook panicked", &ctx);
            }
        }
    }

    /// Flat `component.metric -> value` map suitable for export (§4.5
    /// `get_health_metrics`).
    pub async fn get_health_metrics(&self) -> HashMap<String, f64> {
        let checkers: Vec<(String, Arc<dyn HealthChecker>)> = {
            let guard = self.checkers.read().await;
            guard.iter().map(|(k, v)| (k.clone(), v.checker.clone())).collect()
        };

        let mut flat = HashMap::new();
        for (name, checker) in checkers {
            for (metric, value) in checker.metrics().await {
                flat.insert(format!("{name}.{metric}"), value);
            }
        }
        flat
    }

    /// Derive the aggregate rollup from the most recent per-component
    /// statuses (§4.5 "Overall status").
    pub async fn overall_health(&self) -> OverallHealth {
        let last = self.last_status.read().await;
        let total = last.len();
        let healthy = last.values().filter(|s| s.is_healthy()).count();
        let rate = if total == 0 {
            100.0
        } else {
            (healthy as f64 / total as f64) * 100.0
        };
        OverallHealth {
            healthy_components: healthy,
            total_components: total,
            health_percentage: rate,
            five_nines_compliance: rate >= self.config.five_nines_threshold,
            status: OverallStatus::from_rate(rate),
        }
    }

    pub async fn history(&self) -> Vec<HealthSample> {
        self.history.read().await.iter().cloned().collect()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Drive [`HealthMonitor::perform_health_check`] on a fixed cadence
    /// until [`HealthMonitor::stop`] is called. A no-op if already
    /// running.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let monitor = self.clone();
        let interval = self.config.check_interval;
        let running = self.running.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                monitor.perform_health_check().await;
            }
        });
        // `try_lock` is sufficient: only `start`/`stop` touch this field,
        // and `start` already serialized itself via the `running` CAS.
        if let Ok(mut task) = self.task.try_lock() {
            *task = Some(handle);
        }
    }

    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
        }
    }
}
