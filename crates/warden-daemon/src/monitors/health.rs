use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};
use warden_types::{
    FailureReason, HealthCheckResult, ProcessStatus, WardenResult,
};

use crate::process::ProcessManager;
use crate::supervisor::{CancellationToken, SupervisorLink};

#[derive(Clone, Debug)]
pub struct HealthSettings {
    pub interval: Duration,
    pub initial_delay: Duration,
    pub status_timeout: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            initial_delay: Duration::from_secs(60),
            status_timeout: Duration::from_secs(10),
        }
    }
}

/// Polls the process manager for crashes unrelated to network state.
pub struct HealthChecker {
    manager: Arc<dyn ProcessManager>,
    process_id: String,
    settings: HealthSettings,
    last_result: RwLock<Option<HealthCheckResult>>,
    checks: AtomicU64,
    failures: AtomicU64,
}

impl HealthChecker {
    pub fn new(manager: Arc<dyn ProcessManager>, process_id: impl Into<String>, settings: HealthSettings) -> Self {
        Self {
            manager,
            process_id: process_id.into(),
            settings,
            last_result: RwLock::new(None),
            checks: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn last_result(&self) -> Option<HealthCheckResult> {
        self.last_result.read().clone()
    }

    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// One status query. A status call that outlives the timeout counts as
    /// `Unknown`.
    pub async fn check(&self) -> HealthCheckResult {
        let status = match timeout(self.settings.status_timeout, self.manager.status(&self.process_id)).await {
            Ok(status) => status,
            Err(_) => {
                warn!(
                    "Status query for '{}' timed out after {:?}",
                    self.process_id, self.settings.status_timeout
                );
                ProcessStatus::Unknown
            }
        };

        HealthCheckResult::from_status(status)
    }

    pub async fn tick(&self, link: &dyn SupervisorLink) -> HealthCheckResult {
        // Sampled before the status call so a recovery that lands during it
        // turns this report stale.
        let observed_generation = link.status().generation;
        let result = self.check().await;
        self.checks.fetch_add(1, Ordering::Relaxed);
        *self.last_result.write() = Some(result.clone());

        if result.healthy {
            debug!("Health check passed for '{}'", self.process_id);
            link.report_healthy().await;
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Health check failed for '{}': status {}",
                self.process_id, result.status
            );
            link.report_failure(FailureReason::HealthCheck(result.status), observed_generation)
                .await;
        }

        result
    }

    pub async fn run(&self, link: Arc<dyn SupervisorLink>, mut cancel: CancellationToken) -> WardenResult<()> {
        info!(
            "Health checker for '{}' running every {:?} (first check in {:?})",
            self.process_id, self.settings.interval, self.settings.initial_delay
        );

        if cancel
            .run_until_cancelled(tokio::time::sleep(self.settings.initial_delay))
            .await
            .is_none()
        {
            return Ok(());
        }

        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if cancel.run_until_cancelled(self.tick(link.as_ref())).await.is_none() {
                break;
            }
        }

        info!("Health checker shutting down");
        Ok(())
    }
}
