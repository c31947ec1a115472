use super::ProcessManager;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;
use warden_types::{ProcessStatus, WardenError, WardenResult};

#[derive(Default)]
struct ScriptState {
    statuses: HashMap<String, ProcessStatus>,
    failing_starts: u32,
    always_fail_start: bool,
    fail_restart: bool,
    ignore_stop: bool,
}

/// In-process stand-in for an external process manager.
///
/// Used by the `memory` dry-run mode and throughout the test suite: failures
/// can be scripted and every call is counted.
#[derive(Default)]
pub struct InMemoryProcessManager {
    script: Mutex<ScriptState>,
    latency: Duration,
    start_calls: AtomicU32,
    stop_calls: AtomicU32,
    restart_calls: AtomicU32,
    kill_calls: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mutating call sleeps for `latency` before taking effect.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    pub fn fail_next_starts(&self, count: u32) {
        self.script.lock().failing_starts = count;
    }

    pub fn set_always_fail_start(&self, fail: bool) {
        self.script.lock().always_fail_start = fail;
    }

    pub fn set_fail_restart(&self, fail: bool) {
        self.script.lock().fail_restart = fail;
    }

    /// When set, `stop` succeeds but leaves the process running.
    pub fn set_ignore_stop(&self, ignore: bool) {
        self.script.lock().ignore_stop = ignore;
    }

    /// Simulates an external change, e.g. a crash.
    pub fn set_status(&self, id: &str, status: ProcessStatus) {
        self.script.lock().statuses.insert(id.to_string(), status);
    }

    pub fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> u32 {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn restart_calls(&self) -> u32 {
        self.restart_calls.load(Ordering::SeqCst)
    }

    pub fn kill_calls(&self) -> u32 {
        self.kill_calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrently executing start/restart calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlightGuard { counter: &self.in_flight };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        guard
    }
}

struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProcessManager for InMemoryProcessManager {
    async fn start(&self, id: &str) -> WardenResult<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.enter().await;

        let mut script = self.script.lock();
        if script.always_fail_start || script.failing_starts > 0 {
            script.failing_starts = script.failing_starts.saturating_sub(1);
            debug!("Scripted start failure for '{}'", id);
            return Err(WardenError::start_failure(id, "scripted failure"));
        }
        script.statuses.insert(id.to_string(), ProcessStatus::Running);
        Ok(())
    }

    async fn stop(&self, id: &str) -> WardenResult<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock();
        if !script.ignore_stop {
            script.statuses.insert(id.to_string(), ProcessStatus::Stopped);
        }
        Ok(())
    }

    async fn restart(&self, id: &str) -> WardenResult<()> {
        self.restart_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = self.enter().await;

        let mut script = self.script.lock();
        if script.fail_restart {
            return Err(WardenError::start_failure(id, "scripted restart failure"));
        }
        script.statuses.insert(id.to_string(), ProcessStatus::Running);
        Ok(())
    }

    async fn status(&self, id: &str) -> ProcessStatus {
        self.script
            .lock()
            .statuses
            .get(id)
            .copied()
            .unwrap_or(ProcessStatus::Unknown)
    }

    async fn kill(&self, id: &str) -> WardenResult<()> {
        self.kill_calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .statuses
            .insert(id.to_string(), ProcessStatus::Stopped);
        Ok(())
    }
}
