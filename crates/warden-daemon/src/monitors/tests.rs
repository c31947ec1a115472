use super::*;
use crate::event_log::{EventLog, MemoryLogSink};
use crate::process::{InMemoryProcessManager, ProcessManager};
use crate::supervisor::{CancellationToken, SupervisorLink};
use async_trait::async_trait;
use axum::{http::StatusCode, routing::get, Router};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use warden_types::{
    ConnectivityPhase, FailureReason, ProcessState, ProcessStatus, SupervisedProcess, WardenResult,
};

/// Replays a script of probe answers; `None` hangs forever.
struct ScriptedProbe {
    script: Mutex<VecDeque<Option<bool>>>,
    calls: AtomicU32,
}

impl ScriptedProbe {
    fn new(script: &[Option<bool>]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().copied().collect()),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn check(&self, _host: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front().unwrap_or(Some(true));
        match next {
            Some(reachable) => reachable,
            None => std::future::pending().await,
        }
    }
}

/// Answers per host, for the multi-host rule.
struct PerHostProbe {
    answers: Vec<(&'static str, Option<bool>)>,
}

#[async_trait]
impl ReachabilityProbe for PerHostProbe {
    async fn check(&self, host: &str) -> bool {
        let answer = self
            .answers
            .iter()
            .find(|(h, _)| *h == host)
            .and_then(|(_, a)| *a);
        match answer {
            Some(reachable) => reachable,
            None => std::future::pending().await,
        }
    }
}

#[derive(Default)]
struct RecordingLink {
    state: Mutex<Option<ProcessState>>,
    starts: AtomicU32,
    restarts: AtomicU32,
    healthy_reports: AtomicU32,
    failures: Mutex<Vec<FailureReason>>,
    generation: AtomicU64,
    observed_generations: Mutex<Vec<u64>>,
}

impl RecordingLink {
    fn with_state(state: ProcessState) -> Arc<Self> {
        let link = Self::default();
        *link.state.lock() = Some(state);
        Arc::new(link)
    }
}

#[async_trait]
impl SupervisorLink for RecordingLink {
    fn status(&self) -> SupervisedProcess {
        let mut process = SupervisedProcess::new("bot");
        process.state = self.state.lock().unwrap_or(ProcessState::Stopped);
        process.generation = self.generation.load(Ordering::SeqCst);
        process
    }

    async fn start(&self) -> WardenResult<ProcessState> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(ProcessState::Running)
    }

    async fn restart(&self) -> WardenResult<ProcessState> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        Ok(ProcessState::Running)
    }

    async fn handle_failure(&self, reason: FailureReason) -> ProcessState {
        let generation = self.generation.load(Ordering::SeqCst);
        self.report_failure(reason, generation).await
    }

    async fn report_failure(&self, reason: FailureReason, observed_generation: u64) -> ProcessState {
        self.failures.lock().push(reason);
        self.observed_generations.lock().push(observed_generation);
        ProcessState::Running
    }

    async fn report_healthy(&self) {
        self.healthy_reports.fetch_add(1, Ordering::SeqCst);
    }
}

fn connectivity(probe: Arc<dyn ReachabilityProbe>, hosts: &[&str]) -> (ConnectivityMonitor, Arc<MemoryLogSink>) {
    let sink = Arc::new(MemoryLogSink::new());
    let settings = ConnectivitySettings {
        interval: Duration::from_secs(10),
        probe_timeout: Duration::from_secs(5),
        hosts: hosts.iter().map(|h| h.to_string()).collect(),
    };
    (ConnectivityMonitor::new(probe, settings, EventLog::new(sink.clone())), sink)
}

#[test]
fn test_probe_outcome_combine() {
    use ProbeOutcome::*;
    assert_eq!(ProbeOutcome::combine([TimedOut, Reachable, Unreachable]), Reachable);
    assert_eq!(ProbeOutcome::combine([TimedOut, Unreachable]), Unreachable);
    assert_eq!(ProbeOutcome::combine([TimedOut, TimedOut]), TimedOut);
    assert_eq!(ProbeOutcome::combine([]), TimedOut);
    assert_eq!(TimedOut.phase(), None);
    assert_eq!(Unreachable.phase(), Some(ConnectivityPhase::Offline));
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_acts_on_edges_only() {
    let probe = ScriptedProbe::new(&[Some(true), Some(true), Some(false), Some(false), Some(true)]);
    let (monitor, sink) = connectivity(probe, &["a:53"]);
    let link = RecordingLink::with_state(ProcessState::Running);

    for _ in 0..5 {
        monitor.tick(link.as_ref()).await;
    }

    assert_eq!(link.restarts.load(Ordering::SeqCst), 1);
    assert_eq!(link.starts.load(Ordering::SeqCst), 0);
    assert!(link.failures.lock().is_empty());
    assert_eq!(sink.count_containing("Initial connectivity phase: online"), 1);
    assert_eq!(sink.count_containing("Connectivity lost"), 1);
    assert_eq!(sink.count_containing("Connectivity restored"), 1);

    let state = monitor.state();
    assert_eq!(state.phase, Some(ConnectivityPhase::Online));
    assert_eq!(state.transitions, 2);
    assert!(state.last_transition.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_starts_stopped_process() {
    let probe = ScriptedProbe::new(&[Some(false), Some(true)]);
    let (monitor, _) = connectivity(probe, &["a:53"]);
    let link = RecordingLink::with_state(ProcessState::Failed);

    monitor.tick(link.as_ref()).await;
    assert_eq!(link.starts.load(Ordering::SeqCst), 0);

    monitor.tick(link.as_ref()).await;
    assert_eq!(link.starts.load(Ordering::SeqCst), 1);
    assert_eq!(link.restarts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_probe_timeout_keeps_offline() {
    let probe = ScriptedProbe::new(&[Some(true), Some(false), None, None]);
    let (monitor, sink) = connectivity(probe, &["a:53"]);
    let link = RecordingLink::with_state(ProcessState::Running);

    monitor.tick(link.as_ref()).await;
    monitor.tick(link.as_ref()).await;
    assert_eq!(monitor.state().phase, Some(ConnectivityPhase::Offline));
    let lines_before = sink.lines().len();

    assert_eq!(monitor.tick(link.as_ref()).await, ProbeOutcome::TimedOut);
    assert_eq!(monitor.tick(link.as_ref()).await, ProbeOutcome::TimedOut);

    assert_eq!(monitor.state().phase, Some(ConnectivityPhase::Offline));
    assert_eq!(monitor.state().transitions, 1);
    assert_eq!(sink.lines().len(), lines_before);
    assert_eq!(sink.count_containing("Connectivity lost"), 1);
    assert_eq!(link.starts.load(Ordering::SeqCst), 0);
    assert_eq!(link.restarts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_multi_host_probe() {
    let probe = Arc::new(PerHostProbe {
        answers: vec![("hang:53", None), ("down:53", Some(false)), ("up:53", Some(true))],
    });

    let (monitor, _) = connectivity(probe.clone(), &["hang:53", "down:53", "up:53"]);
    assert_eq!(monitor.probe().await, ProbeOutcome::Reachable);

    let (monitor, _) = connectivity(probe.clone(), &["hang:53", "down:53"]);
    assert_eq!(monitor.probe().await, ProbeOutcome::Unreachable);

    let (monitor, _) = connectivity(probe, &["hang:53"]);
    assert_eq!(monitor.probe().await, ProbeOutcome::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_run_until_cancelled() {
    let probe = ScriptedProbe::new(&[]);
    let (monitor, _) = connectivity(probe.clone(), &["a:53"]);
    let monitor = Arc::new(monitor);
    let link: Arc<dyn SupervisorLink> = RecordingLink::with_state(ProcessState::Running);

    let (cancel_tx, token) = CancellationToken::new();
    let runner = monitor.clone();
    let handle = tokio::spawn(async move { runner.run(link, token).await });

    tokio::time::sleep(Duration::from_secs(35)).await;
    cancel_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
    assert_eq!(monitor.state().phase, Some(ConnectivityPhase::Online));
}

#[tokio::test(start_paused = true)]
async fn test_health_reports() {
    let manager = Arc::new(InMemoryProcessManager::new());
    let checker = HealthChecker::new(manager.clone(), "bot", HealthSettings::default());
    let link = RecordingLink::with_state(ProcessState::Running);

    manager.set_status("bot", ProcessStatus::Running);
    let result = checker.tick(link.as_ref()).await;
    assert!(result.healthy);
    assert_eq!(link.healthy_reports.load(Ordering::SeqCst), 1);

    manager.set_status("bot", ProcessStatus::Stopped);
    let result = checker.tick(link.as_ref()).await;
    assert!(!result.healthy);
    assert_eq!(
        link.failures.lock().as_slice(),
        &[FailureReason::HealthCheck(ProcessStatus::Stopped)]
    );

    assert_eq!(checker.checks(), 2);
    assert_eq!(checker.failures(), 1);
    assert_eq!(checker.last_result().map(|r| r.status), Some(ProcessStatus::Stopped));
}

struct HangingManager;

#[async_trait]
impl ProcessManager for HangingManager {
    async fn start(&self, _id: &str) -> WardenResult<()> {
        Ok(())
    }

    async fn stop(&self, _id: &str) -> WardenResult<()> {
        Ok(())
    }

    async fn restart(&self, _id: &str) -> WardenResult<()> {
        Ok(())
    }

    async fn status(&self, _id: &str) -> ProcessStatus {
        std::future::pending().await
    }
}

/// Status call during which the supervisor recovers the process.
struct RecoveringManager {
    link: Arc<RecordingLink>,
}

#[async_trait]
impl ProcessManager for RecoveringManager {
    async fn start(&self, _id: &str) -> WardenResult<()> {
        Ok(())
    }

    async fn stop(&self, _id: &str) -> WardenResult<()> {
        Ok(())
    }

    async fn restart(&self, _id: &str) -> WardenResult<()> {
        Ok(())
    }

    async fn status(&self, _id: &str) -> ProcessStatus {
        self.link.generation.fetch_add(1, Ordering::SeqCst);
        ProcessStatus::Stopped
    }
}

#[tokio::test(start_paused = true)]
async fn test_health_failure_carries_pre_check_generation() {
    let link = RecordingLink::with_state(ProcessState::Running);
    link.generation.store(7, Ordering::SeqCst);
    let manager = Arc::new(RecoveringManager { link: link.clone() });
    let checker = HealthChecker::new(manager, "bot", HealthSettings::default());

    let result = checker.tick(link.as_ref()).await;

    assert!(!result.healthy);
    assert_eq!(link.observed_generations.lock().as_slice(), &[7]);
    assert_eq!(link.generation.load(Ordering::SeqCst), 8);
}

#[tokio::test(start_paused = true)]
async fn test_health_status_timeout_is_failure() {
    let checker = HealthChecker::new(Arc::new(HangingManager), "bot", HealthSettings::default());
    let link = RecordingLink::with_state(ProcessState::Running);

    let result = checker.tick(link.as_ref()).await;
    assert_eq!(result.status, ProcessStatus::Unknown);
    assert_eq!(
        link.failures.lock().as_slice(),
        &[FailureReason::HealthCheck(ProcessStatus::Unknown)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_health_initial_delay() {
    let manager = Arc::new(InMemoryProcessManager::new());
    manager.set_status("bot", ProcessStatus::Running);
    let checker = Arc::new(HealthChecker::new(manager, "bot", HealthSettings::default()));
    let link: Arc<dyn SupervisorLink> = RecordingLink::with_state(ProcessState::Running);

    let (cancel_tx, token) = CancellationToken::new();
    let runner = checker.clone();
    let handle = tokio::spawn(async move { runner.run(link, token).await });

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(checker.checks(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(checker.checks(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(checker.checks(), 2);

    cancel_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();
}

async fn spawn_ping_server(healthy: Arc<AtomicBool>, body: &'static str) -> String {
    let app = Router::new().route(
        "/ping",
        get(move || {
            let healthy = healthy.clone();
            async move {
                if healthy.load(Ordering::SeqCst) {
                    (StatusCode::OK, body)
                } else {
                    (StatusCode::SERVICE_UNAVAILABLE, "down")
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn self_ping(target: String) -> (SelfPingLoop, Arc<MemoryLogSink>) {
    let sink = Arc::new(MemoryLogSink::new());
    let mut settings = SelfPingSettings::new(target);
    settings.timeout = Duration::from_secs(2);
    (SelfPingLoop::new(settings, EventLog::new(sink.clone())).unwrap(), sink)
}

#[tokio::test]
async fn test_self_ping_alerts_once_per_failure_run() {
    let healthy = Arc::new(AtomicBool::new(false));
    let target = spawn_ping_server(healthy.clone(), "pong").await;
    let (pinger, sink) = self_ping(target);

    for _ in 0..3 {
        assert!(!pinger.tick().await);
    }
    assert_eq!(sink.count_containing("ALERT"), 1);
    assert_eq!(pinger.status().consecutive_failures, 3);

    assert!(!pinger.tick().await);
    assert_eq!(sink.count_containing("ALERT"), 1);

    healthy.store(true, Ordering::SeqCst);
    assert!(pinger.tick().await);
    let status = pinger.status();
    assert_eq!(status.consecutive_failures, 0);
    assert_eq!(status.ping_count, 1);
    assert!(status.last_ping_time.is_some());

    healthy.store(false, Ordering::SeqCst);
    for _ in 0..3 {
        pinger.tick().await;
    }
    assert_eq!(sink.count_containing("ALERT"), 2);

    let history = pinger.history();
    assert_eq!(history.len(), 8);
    assert_eq!(history.iter().filter(|r| r.success).count(), 1);
    assert_eq!(history.last().map(|r| r.sequence), Some(8));
}

#[tokio::test]
async fn test_self_ping_timeout_is_failure() {
    let app = Router::new().route(
        "/ping",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "pong"
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let sink = Arc::new(MemoryLogSink::new());
    let mut settings = SelfPingSettings::new(format!("http://{}", addr));
    settings.timeout = Duration::from_millis(200);
    let pinger = SelfPingLoop::new(settings, EventLog::new(sink)).unwrap();

    let begin = std::time::Instant::now();
    assert!(!pinger.tick().await);
    assert!(begin.elapsed() < Duration::from_secs(4));

    let status = pinger.status();
    assert_eq!(status.consecutive_failures, 1);
    assert_eq!(status.ping_count, 0);
    assert_eq!(pinger.history().last().map(|r| r.success), Some(false));
}

#[tokio::test]
async fn test_self_ping_rejects_wrong_body() {
    let target = spawn_ping_server(Arc::new(AtomicBool::new(true)), "ok").await;
    let (pinger, _) = self_ping(target);

    assert!(pinger.ping().await.is_err());
    assert!(!pinger.tick().await);
    assert_eq!(pinger.status().ping_count, 0);
}

#[tokio::test]
async fn test_self_ping_url() {
    let (pinger, _) = self_ping("http://example.invalid:3000/".to_string());
    assert_eq!(pinger.ping_url(), "http://example.invalid:3000/ping");
    assert_eq!(pinger.status().target_url, "http://example.invalid:3000/ping");
    assert!(!pinger.status().is_running);
}
