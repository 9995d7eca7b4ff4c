//! Cross-component integration tests for the Reliability Core.
//!
//! These exercise components stacked the way a host application would
//! actually compose them, rather than in isolation:
//!
//! 1. A bulkhead wrapping a circuit breaker wrapping a pool acquire.
//! 2. The health monitor and self-healer reacting to the same
//!    degrading dependency.

use reliability_core::config::PoolConfig;
use reliability_core::error::ResilienceError;
use reliability_core::healer::{HealingReason, SelfHealer};
use reliability_core::health_monitor::{HealthChecker, HealthMonitor, HealthRecord, HealthStatus};
use reliability_core::pool::{Pool, ResourceFactory};
use reliability_core::{Bulkhead, CircuitBreaker, CircuitBreakerConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct CountingConnectionFactory {
    created: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ResourceFactory<u32> for CountingConnectionFactory {
    async fn create(&self) -> Result<u32, ResilienceError> {
        Ok(self.created.fetch_add(1, Ordering::SeqCst) as u32)
    }
}

fn pool_config() -> PoolConfig {
    PoolConfig {
        min_size: 0,
        max_size: 2,
        strategy: Default::default(),
        max_idle_age: Duration::from_secs(60),
        max_lifetime: Duration::from_secs(3600),
        acquire_timeout: Duration::from_millis(100),
    }
}

/// Bulkhead admits up to two concurrent callers into a breaker-guarded
/// pool acquire; with both connections on loan, a third waits out the
/// pool's acquire timeout and the breaker propagates that failure as-is.
#[tokio::test]
async fn bulkhead_wraps_breaker_wraps_pool_acquire() {
    let created = Arc::new(AtomicUsize::new(0));
    let pool = Arc::new(Pool::new(
        "db",
        Arc::new(CountingConnectionFactory {
            created: created.clone(),
        }),
        pool_config(),
        None,
        None,
    ));
    let breaker = CircuitBreaker::new("db", CircuitBreakerConfig::default());
    let bulkhead = Bulkhead::new("db", 2);

    let stacked = |pool: Arc<Pool<u32>>, breaker: CircuitBreaker, bulkhead: Arc<Bulkhead>| async move {
        bulkhead
            .execute(None, || async {
                breaker
                    .call(|| async { pool.acquire(None).await })
                    .await
            })
            .await
    };

    let bulkhead = Arc::new(bulkhead);
    let r1 = stacked(pool.clone(), breaker.clone(), bulkhead.clone()).await;
    let r2 = stacked(pool.clone(), breaker.clone(), bulkhead.clone()).await;
    assert!(r1.is_ok());
    assert!(r2.is_ok());
    assert_eq!(created.load(Ordering::SeqCst), 2);

    // Both connections are still on loan (never released) and max_size is
    // 2, so a third acquire queues as a waiter and times out; the breaker
    // sees that as an ordinary failed call and propagates it unchanged.
    let r3 = stacked(pool, breaker, bulkhead).await;
    assert!(matches!(r3, Err(ResilienceError::Timeout(_))));
}

struct FlakyChecker {
    healthy: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl HealthChecker for FlakyChecker {
    async fn check(&self) -> HealthRecord {
        if self.healthy.load(Ordering::SeqCst) {
            HealthRecord {
                status: HealthStatus::Healthy,
                healthy: true,
                metrics: Default::default(),
                details: Default::default(),
            }
        } else {
            HealthRecord {
                status: HealthStatus::Critical,
                healthy: false,
                metrics: Default::default(),
                details: Default::default(),
            }
        }
    }
}

/// A component the health monitor reports unhealthy is fed into the
/// self-healer as `HealingReason::HealthCheckFailure`; after the
/// dependency recovers, a subsequent health check reflects it and the
/// healer's own degraded-set can be cleared.
#[tokio::test]
async fn health_monitor_signal_drives_self_healer_retry() {
    let healthy = Arc::new(AtomicBool::new(false));
    let monitor = HealthMonitor::new(reliability_core::config::HealthConfig::default());
    monitor
        .register_component_monitor(
            "downstream",
            Arc::new(FlakyChecker {
                healthy: healthy.clone(),
            }),
        )
        .await;

    let sample = monitor.perform_health_check().await;
    assert!(!sample.components["downstream"].healthy);

    let healer = SelfHealer::builder(reliability_core::config::HealerConfig {
        max_retries: 3,
        backoff: reliability_core::config::BackoffConfig {
            base_secs: 0,
            cap_secs: 0,
            jitter: false,
        },
        dlq_capacity: 4,
    })
    .build();

    let healthy_clone = healthy.clone();
    let result: Result<(), ResilienceError> = healer
        .execute_with_healing("downstream-call", "downstream", HealingReason::HealthCheckFailure, move || {
            let healthy = healthy_clone.clone();
            async move {
                if healthy.load(Ordering::SeqCst) {
                    Ok(())
                } else {
                    Err(ResilienceError::transient("downstream unavailable"))
                }
            }
        })
        .await;
    assert!(result.is_err());
    assert!(healer.is_degraded("downstream").await || healer.dlq_stats().await.current_count == 1);

    healthy.store(true, Ordering::SeqCst);
    let sample = monitor.perform_health_check().await;
    assert!(sample.components["downstream"].healthy);
}
