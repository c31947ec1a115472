use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{watch, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use warden_types::{
    FailureReason, ProcessState, ProcessStatus, RestartPolicy, SupervisedProcess, WardenError,
    WardenResult,
};

use super::cancellation::CancellationToken;
use super::link::SupervisorLink;
use super::stats::{MonitorMetrics, SupervisorStats};
use super::types::{StartTrigger, SupervisorConfig, STOP_POLL_INTERVAL_MS};
use crate::event_log::EventLog;
use crate::process::ProcessManager;

trait MonitorFactory: Send + Sync {
    fn spawn(&self, link: Arc<dyn SupervisorLink>, cancel: CancellationToken) -> JoinHandle<WardenResult<()>>;
}

struct MonitorFactoryImpl<F, Fut>
where
    F: Fn(Arc<dyn SupervisorLink>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WardenResult<()>> + Send + 'static,
{
    factory: F,
}

impl<F, Fut> MonitorFactory for MonitorFactoryImpl<F, Fut>
where
    F: Fn(Arc<dyn SupervisorLink>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WardenResult<()>> + Send + 'static,
{
    fn spawn(&self, link: Arc<dyn SupervisorLink>, cancel: CancellationToken) -> JoinHandle<WardenResult<()>> {
        tokio::spawn((self.factory)(link, cancel))
    }
}

struct MonitorTask {
    name: String,
    factory: Arc<dyn MonitorFactory>,
    handle: JoinHandle<WardenResult<()>>,
    restarts: u32,
}

struct MonitorSet {
    cancel_tx: watch::Sender<bool>,
    token: CancellationToken,
    link: Arc<dyn SupervisorLink>,
    tasks: Vec<MonitorTask>,
    watchdog: JoinHandle<()>,
}

struct SupervisorInner {
    config: SupervisorConfig,
    manager: Arc<dyn ProcessManager>,
    events: EventLog,
    process: RwLock<SupervisedProcess>,
    lifecycle: tokio::sync::Mutex<()>,
    factories: RwLock<Vec<(String, Arc<dyn MonitorFactory>)>>,
    monitors: Mutex<Option<MonitorSet>>,
    stop_tx: watch::Sender<bool>,
    session_id: Uuid,
    created_at: Instant,
    running_since: RwLock<Option<Instant>>,
    total_start_calls: AtomicU64,
    total_defensive_restarts: AtomicU64,
    total_failures: AtomicU64,
    total_recoveries: AtomicU64,
}

/// Owner of the supervised process's lifecycle.
///
/// Cloning yields another handle to the same supervisor. All lifecycle
/// mutation (`start`, `stop`, `restart`, `handle_failure`, `report_healthy`)
/// is serialized by one async lock, so at most one process-manager
/// start/restart call is in flight at a time.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, manager: Arc<dyn ProcessManager>, events: EventLog) -> Self {
        let process = SupervisedProcess::new(config.process_id.clone());
        let (stop_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(SupervisorInner {
                config,
                manager,
                events,
                process: RwLock::new(process),
                lifecycle: tokio::sync::Mutex::new(()),
                factories: RwLock::new(Vec::new()),
                monitors: Mutex::new(None),
                stop_tx,
                session_id: Uuid::new_v4(),
                created_at: Instant::now(),
                running_since: RwLock::new(None),
                total_start_calls: AtomicU64::new(0),
                total_defensive_restarts: AtomicU64::new(0),
                total_failures: AtomicU64::new(0),
                total_recoveries: AtomicU64::new(0),
            }),
        }
    }

    /// Registers a monitor to be spawned on the next successful start.
    pub fn register_monitor<F, Fut>(&self, name: &str, factory: F) -> WardenResult<()>
    where
        F: Fn(Arc<dyn SupervisorLink>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WardenResult<()>> + Send + 'static,
    {
        let mut factories = self.inner.factories.write();
        if factories.iter().any(|(existing, _)| existing == name) {
            return Err(WardenError::Internal(format!(
                "Monitor '{}' already registered",
                name
            )));
        }

        let monitor_name = name.to_string();
        let wrapped = move |link: Arc<dyn SupervisorLink>, cancel: CancellationToken| {
            let run = factory(link, cancel);
            let monitor_name = monitor_name.clone();
            async move {
                let result = run.await;
                match result {
                    Ok(()) => debug!("Monitor '{}' exited", monitor_name),
                    Err(ref e) => error!("Monitor '{}' exited with error: {}", monitor_name, e),
                }
                result
            }
        };

        factories.push((name.to_string(), Arc::new(MonitorFactoryImpl { factory: wrapped })));
        debug!("Registered monitor: {}", name);
        Ok(())
    }

    pub fn process_id(&self) -> &str {
        &self.inner.config.process_id
    }

    pub fn policy(&self) -> RestartPolicy {
        self.inner.config.policy
    }

    pub fn status(&self) -> SupervisedProcess {
        self.inner.process.read().clone()
    }

    pub fn events(&self) -> &EventLog {
        &self.inner.events
    }

    /// Explicit start. Re-arms a fatal process and resets the restart counter.
    pub async fn start(&self) -> WardenResult<()> {
        self.start_with(StartTrigger::External).await.map(|_| ())
    }

    pub async fn start_with(&self, trigger: StartTrigger) -> WardenResult<ProcessState> {
        if trigger == StartTrigger::External {
            self.inner.stop_tx.send_replace(false);
        }

        let lock = self.inner.lifecycle.lock().await;
        let state = self.inner.process.read().state;

        match (trigger, state) {
            (StartTrigger::External, ProcessState::Running) => {
                self.spawn_monitors();
                return Ok(state);
            }
            (StartTrigger::Monitor, ProcessState::Running) => return Ok(state),
            (StartTrigger::Monitor, ProcessState::Fatal) => {
                debug!(
                    "Ignoring monitor start for '{}': fatal state needs an explicit start",
                    self.process_id()
                );
                return Ok(state);
            }
            (StartTrigger::Monitor, _) if self.stop_requested() => return Ok(state),
            _ => {}
        }

        {
            let mut process = self.inner.process.write();
            process.restart_count = 0;
            process.last_error = None;
        }
        self.transition(ProcessState::Starting);
        self.inner.events.info(&format!(
            "Starting process '{}' (trigger: {}, from: {})",
            self.process_id(),
            trigger,
            state
        ));

        match self.launch().await {
            Ok(()) => {
                self.mark_running();
                self.inner
                    .events
                    .info(&format!("Process '{}' is running", self.process_id()));
                if trigger == StartTrigger::External {
                    self.spawn_monitors();
                }
                Ok(ProcessState::Running)
            }
            Err(e) => {
                let err = match e {
                    WardenError::ProcessStartFailure { .. } => e,
                    other => WardenError::start_failure(self.process_id(), other),
                };
                self.inner.events.warn(&format!("{}", err));

                let outcome = self
                    .recover(&lock, FailureReason::StartFailure(err.to_string()))
                    .await;
                match outcome {
                    ProcessState::Running if trigger == StartTrigger::External => {
                        self.spawn_monitors()
                    }
                    ProcessState::Fatal => return Err(self.policy_exhausted()),
                    _ => {}
                }
                Err(err)
            }
        }
    }

    /// Failure report observed against the current generation.
    pub async fn handle_failure(&self, reason: FailureReason) -> ProcessState {
        let observed_generation = self.inner.process.read().generation;
        self.report_failure(reason, observed_generation).await
    }

    /// Single entry point for failure reports from the monitors. A report
    /// whose `observed_generation` predates a recovery or restart of a
    /// running process is dropped.
    pub async fn report_failure(&self, reason: FailureReason, observed_generation: u64) -> ProcessState {
        let lock = self.inner.lifecycle.lock().await;

        let (state, generation) = {
            let process = self.inner.process.read();
            (process.state, process.generation)
        };

        match state {
            ProcessState::Fatal | ProcessState::Stopped => {
                debug!(
                    "Ignoring failure report for '{}' in state {}: {}",
                    self.process_id(),
                    state,
                    reason
                );
                return state;
            }
            ProcessState::Running if generation != observed_generation => {
                debug!(
                    "Dropping stale failure report for '{}' (recovered meanwhile): {}",
                    self.process_id(),
                    reason
                );
                return state;
            }
            _ => {}
        }

        if self.stop_requested() {
            return state;
        }

        self.recover(&lock, reason).await
    }

    pub async fn report_healthy(&self) {
        let _lock = self.inner.lifecycle.lock().await;
        let mut process = self.inner.process.write();
        if process.state == ProcessState::Running && process.restart_count > 0 {
            info!(
                "Process '{}' healthy, restart counter reset (was {})",
                process.id, process.restart_count
            );
            process.restart_count = 0;
            process.last_error = None;
        }
    }

    /// Defensive restart of a running process, used after connectivity
    /// returns. No-op in any other state.
    pub async fn restart(&self) -> WardenResult<ProcessState> {
        let lock = self.inner.lifecycle.lock().await;
        let state = self.inner.process.read().state;
        if state != ProcessState::Running || self.stop_requested() {
            return Ok(state);
        }

        self.inner.events.info(&format!(
            "Restarting process '{}' to clear stale session state",
            self.process_id()
        ));
        self.inner.total_defensive_restarts.fetch_add(1, Ordering::Relaxed);

        match self.inner.manager.restart(self.process_id()).await {
            Ok(()) => {
                self.inner.process.write().mark_restarted();
                *self.inner.running_since.write() = Some(Instant::now());
                Ok(ProcessState::Running)
            }
            Err(e) => {
                self.inner
                    .events
                    .warn(&format!("Restart of '{}' failed: {}", self.process_id(), e));
                match self
                    .recover(&lock, FailureReason::RestartFailure(e.to_string()))
                    .await
                {
                    ProcessState::Fatal => Err(self.policy_exhausted()),
                    state => Ok(state),
                }
            }
        }
    }

    /// Cancels the monitors, stops the process and waits for it to exit.
    /// Idempotent.
    pub async fn stop(&self) -> WardenResult<()> {
        self.inner.stop_tx.send_replace(true);

        let monitors = self.inner.monitors.lock().take();
        if let Some(set) = monitors {
            self.shutdown_monitors(set).await;
        }

        let _lock = self.inner.lifecycle.lock().await;
        if self.inner.process.read().state == ProcessState::Stopped {
            debug!("Process '{}' already stopped", self.process_id());
            return Ok(());
        }

        let id = self.process_id().to_string();
        self.inner.events.info(&format!("Stopping process '{}'", id));

        if let Err(e) = self.inner.manager.stop(&id).await {
            warn!("Stop command for '{}' failed: {}", id, e);
        }

        let grace = self.inner.config.shutdown_grace;
        let deadline = tokio::time::Instant::now() + grace;
        loop {
            let status = self.inner.manager.status(&id).await;
            if !status.is_running() {
                break;
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                self.inner.events.warn(&format!(
                    "Process '{}' did not exit within {:?}, force-terminating",
                    id, grace
                ));
                if let Err(e) = self.inner.manager.kill(&id).await {
                    error!("Force-terminate of '{}' failed: {}", id, e);
                }
                break;
            }

            tokio::time::sleep(remaining.min(Duration::from_millis(STOP_POLL_INTERVAL_MS))).await;
        }

        self.transition(ProcessState::Stopped);
        *self.inner.running_since.write() = None;
        self.inner.events.info(&format!("Process '{}' stopped", id));
        Ok(())
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested()
    }

    pub fn stats(&self) -> SupervisorStats {
        let process = self.status();
        let monitors = self
            .inner
            .monitors
            .lock()
            .as_ref()
            .map(|set| {
                set.tasks
                    .iter()
                    .map(|task| MonitorMetrics {
                        name: task.name.clone(),
                        running: !task.handle.is_finished(),
                        restarts: task.restarts,
                    })
                    .collect()
            })
            .unwrap_or_default();

        SupervisorStats {
            session_id: self.inner.session_id,
            process_id: process.id,
            state: process.state,
            restart_count: process.restart_count,
            max_attempts: self.inner.config.policy.max_attempts,
            total_start_calls: self.inner.total_start_calls.load(Ordering::Relaxed),
            total_defensive_restarts: self.inner.total_defensive_restarts.load(Ordering::Relaxed),
            total_failures: self.inner.total_failures.load(Ordering::Relaxed),
            total_recoveries: self.inner.total_recoveries.load(Ordering::Relaxed),
            process_uptime_secs: self
                .inner
                .running_since
                .read()
                .map(|since| since.elapsed().as_secs())
                .unwrap_or(0),
            supervisor_uptime_secs: self.inner.created_at.elapsed().as_secs(),
            monitors,
        }
    }

    /// Bounded-retry recovery. The caller must hold the lifecycle lock for the
    /// whole call.
    async fn recover(&self, _held: &MutexGuard<'_, ()>, reason: FailureReason) -> ProcessState {
        let policy = self.inner.config.policy;
        let mut reason = reason;

        loop {
            self.inner.total_failures.fetch_add(1, Ordering::Relaxed);

            let attempt = {
                let mut process = self.inner.process.write();
                process.restart_count += 1;
                process.last_error = Some(reason.to_string());
                process.restart_count
            };
            self.transition(ProcessState::Failed);

            if !policy.allows(attempt) {
                self.transition(ProcessState::Fatal);
                self.inner.events.alert(&format!(
                    "Restart policy exhausted for '{}' after {} attempts (last failure: {}); explicit start required",
                    self.process_id(),
                    policy.max_attempts,
                    reason
                ));
                return ProcessState::Fatal;
            }

            self.transition(ProcessState::Starting);
            self.inner.events.warn(&format!(
                "Process '{}' failed ({}); restart attempt {}/{} in {:?}",
                self.process_id(),
                reason,
                attempt,
                policy.max_attempts,
                policy.fixed_delay
            ));

            let mut stop = self.stop_token();
            if stop
                .run_until_cancelled(tokio::time::sleep(policy.fixed_delay))
                .await
                .is_none()
            {
                self.inner.events.info(&format!(
                    "Restart of '{}' abandoned: stop requested",
                    self.process_id()
                ));
                return self.inner.process.read().state;
            }

            match self.launch().await {
                Ok(()) => {
                    self.mark_running();
                    self.inner.total_recoveries.fetch_add(1, Ordering::Relaxed);
                    self.inner.events.info(&format!(
                        "Process '{}' recovered on attempt {}",
                        self.process_id(),
                        attempt
                    ));
                    return ProcessState::Running;
                }
                Err(e) => {
                    reason = FailureReason::StartFailure(e.to_string());
                }
            }
        }
    }

    async fn launch(&self) -> WardenResult<()> {
        self.inner.total_start_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.manager.start(self.process_id()).await?;
        self.spawn_start_verification();
        Ok(())
    }

    fn spawn_start_verification(&self) {
        let delay = self.inner.config.start_verify_delay;
        if delay.is_zero() {
            return;
        }

        let manager = self.inner.manager.clone();
        let events = self.inner.events.clone();
        let id = self.process_id().to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match manager.status(&id).await {
                ProcessStatus::Running => debug!("Start of '{}' verified", id),
                other => events.warn(&format!(
                    "Start command for '{}' succeeded but status is {} after {:?}",
                    id, other, delay
                )),
            }
        });
    }

    fn policy_exhausted(&self) -> WardenError {
        WardenError::policy_exhausted(self.process_id(), self.inner.config.policy.max_attempts)
    }

    fn mark_running(&self) {
        self.transition(ProcessState::Running);
        *self.inner.running_since.write() = Some(Instant::now());
    }

    fn transition(&self, next: ProcessState) {
        let mut process = self.inner.process.write();
        let from = process.state;
        if process.transition(next) {
            debug!("Process '{}': {} -> {}", process.id, from, next);
        } else {
            warn!("Rejected transition for '{}': {} -> {}", process.id, from, next);
        }
    }

    fn stop_requested(&self) -> bool {
        *self.inner.stop_tx.borrow()
    }

    fn stop_token(&self) -> CancellationToken {
        CancellationToken::from_receiver(self.inner.stop_tx.subscribe())
    }

    fn spawn_monitors(&self) {
        let mut monitors = self.inner.monitors.lock();
        if monitors.is_some() {
            return;
        }

        let factories: Vec<(String, Arc<dyn MonitorFactory>)> = self.inner.factories.read().clone();
        if factories.is_empty() {
            return;
        }

        let (cancel_tx, token) = CancellationToken::new();
        let link: Arc<dyn SupervisorLink> = Arc::new(WeakLink {
            inner: Arc::downgrade(&self.inner),
            process_id: self.process_id().to_string(),
        });
        let tasks = factories
            .iter()
            .map(|(name, factory)| MonitorTask {
                name: name.clone(),
                factory: factory.clone(),
                handle: factory.spawn(link.clone(), token.clone()),
                restarts: 0,
            })
            .collect::<Vec<_>>();

        info!(
            "Spawned {} monitors for '{}': {}",
            tasks.len(),
            self.process_id(),
            tasks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
        );

        let watchdog = tokio::spawn(watch_monitors(
            Arc::downgrade(&self.inner),
            token.clone(),
            self.inner.config.monitor_restart_delay,
        ));
        *monitors = Some(MonitorSet {
            cancel_tx,
            token,
            link,
            tasks,
            watchdog,
        });
    }

    /// Respawns monitors that exited on their own. Does nothing once a stop
    /// has been requested.
    fn respawn_finished_monitors(&self) {
        let mut monitors = self.inner.monitors.lock();
        let set = match monitors.as_mut() {
            Some(set) => set,
            None => return,
        };
        if self.stop_requested() || set.token.is_cancelled() {
            return;
        }

        for task in set.tasks.iter_mut().filter(|task| task.handle.is_finished()) {
            task.handle = task.factory.spawn(set.link.clone(), set.token.clone());
            task.restarts += 1;
            self.inner.events.warn(&format!(
                "Monitor '{}' for '{}' exited unexpectedly, respawned (restart {})",
                task.name,
                self.process_id(),
                task.restarts
            ));
        }
    }

    async fn shutdown_monitors(&self, set: MonitorSet) {
        set.watchdog.abort();
        let _ = set.cancel_tx.send(true);
        let deadline = tokio::time::Instant::now() + self.inner.config.shutdown_grace;

        for mut task in set.tasks {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, &mut task.handle).await {
                Ok(Ok(Ok(()))) => debug!("Monitor '{}' shut down cleanly", task.name),
                Ok(Ok(Err(e))) => warn!("Monitor '{}' exited with error: {}", task.name, e),
                Ok(Err(e)) => warn!("Monitor '{}' panicked: {}", task.name, e),
                Err(_) => {
                    warn!("Monitor '{}' did not stop in time, aborting", task.name);
                    task.handle.abort();
                }
            }
        }
    }
}

async fn watch_monitors(inner: Weak<SupervisorInner>, mut cancel: CancellationToken, period: Duration) {
    let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match inner.upgrade() {
            Some(inner) => Supervisor { inner }.respawn_finished_monitors(),
            None => break,
        }
    }
}

/// Link handed to monitors. Holds the supervisor weakly so running monitors
/// never keep it alive; once it is dropped the process reads as stopped and
/// every request is a no-op.
struct WeakLink {
    inner: Weak<SupervisorInner>,
    process_id: String,
}

impl WeakLink {
    fn upgrade(&self) -> Option<Supervisor> {
        self.inner.upgrade().map(|inner| Supervisor { inner })
    }
}

#[async_trait]
impl SupervisorLink for WeakLink {
    fn status(&self) -> SupervisedProcess {
        match self.upgrade() {
            Some(supervisor) => supervisor.status(),
            None => SupervisedProcess::new(self.process_id.clone()),
        }
    }

    async fn start(&self) -> WardenResult<ProcessState> {
        match self.upgrade() {
            Some(supervisor) => SupervisorLink::start(&supervisor).await,
            None => Ok(ProcessState::Stopped),
        }
    }

    async fn restart(&self) -> WardenResult<ProcessState> {
        match self.upgrade() {
            Some(supervisor) => supervisor.restart().await,
            None => Ok(ProcessState::Stopped),
        }
    }

    async fn handle_failure(&self, reason: FailureReason) -> ProcessState {
        match self.upgrade() {
            Some(supervisor) => supervisor.handle_failure(reason).await,
            None => ProcessState::Stopped,
        }
    }

    async fn report_failure(&self, reason: FailureReason, observed_generation: u64) -> ProcessState {
        match self.upgrade() {
            Some(supervisor) => supervisor.report_failure(reason, observed_generation).await,
            None => ProcessState::Stopped,
        }
    }

    async fn report_healthy(&self) {
        if let Some(supervisor) = self.upgrade() {
            supervisor.report_healthy().await;
        }
    }
}

#[async_trait]
impl SupervisorLink for Supervisor {
    fn status(&self) -> SupervisedProcess {
        Supervisor::status(self)
    }

    async fn start(&self) -> WardenResult<ProcessState> {
        self.start_with(StartTrigger::Monitor).await
    }

    async fn restart(&self) -> WardenResult<ProcessState> {
        Supervisor::restart(self).await
    }

    async fn handle_failure(&self, reason: FailureReason) -> ProcessState {
        Supervisor::handle_failure(self, reason).await
    }

    async fn report_failure(&self, reason: FailureReason, observed_generation: u64) -> ProcessState {
        Supervisor::report_failure(self, reason, observed_generation).await
    }

    async fn report_healthy(&self) {
        Supervisor::report_healthy(self).await
    }
}
