use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};
use warden_types::{ConnectivityPhase, ConnectivityState, ProcessState, WardenError, WardenResult};

use crate::event_log::EventLog;
use crate::supervisor::{CancellationToken, SupervisorLink};

/// Answers "is this host reachable right now".
///
/// Implementations need not bound their own latency; the monitor wraps every
/// call in the configured probe timeout.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn check(&self, host: &str) -> bool;
}

/// Opens a TCP connection to `host:port` and drops it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpReachabilityProbe;

#[async_trait]
impl ReachabilityProbe for TcpReachabilityProbe {
    async fn check(&self, host: &str) -> bool {
        match TcpStream::connect(host).await {
            Ok(_) => true,
            Err(e) => {
                debug!("TCP probe to {} failed: {}", host, e);
                false
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
    TimedOut,
}

impl ProbeOutcome {
    /// `None` for a timeout, which never changes the phase.
    pub fn phase(&self) -> Option<ConnectivityPhase> {
        match self {
            ProbeOutcome::Reachable => Some(ConnectivityPhase::Online),
            ProbeOutcome::Unreachable => Some(ConnectivityPhase::Offline),
            ProbeOutcome::TimedOut => None,
        }
    }

    /// Any reachable host wins; otherwise one definitive failure is enough.
    pub fn combine(outcomes: impl IntoIterator<Item = ProbeOutcome>) -> ProbeOutcome {
        let mut combined = ProbeOutcome::TimedOut;
        for outcome in outcomes {
            match outcome {
                ProbeOutcome::Reachable => return ProbeOutcome::Reachable,
                ProbeOutcome::Unreachable => combined = ProbeOutcome::Unreachable,
                ProbeOutcome::TimedOut => {}
            }
        }
        combined
    }
}

#[derive(Clone, Debug)]
pub struct ConnectivitySettings {
    pub interval: Duration,
    pub probe_timeout: Duration,
    pub hosts: Vec<String>,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            hosts: vec!["8.8.8.8:53".to_string(), "1.1.1.1:53".to_string()],
        }
    }
}

/// Online/offline edge detector. Acts only when the phase changes.
pub struct ConnectivityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    settings: ConnectivitySettings,
    events: EventLog,
    state: RwLock<ConnectivityState>,
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<dyn ReachabilityProbe>, settings: ConnectivitySettings, events: EventLog) -> Self {
        Self {
            probe,
            settings,
            events,
            state: RwLock::new(ConnectivityState::default()),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state.read().clone()
    }

    pub fn settings(&self) -> &ConnectivitySettings {
        &self.settings
    }

    /// Probes every configured host concurrently, each bounded by the probe
    /// timeout.
    pub async fn probe(&self) -> ProbeOutcome {
        let limit = self.settings.probe_timeout;
        let checks = self.settings.hosts.iter().map(|host| async move {
            match timeout(limit, self.probe.check(host)).await {
                Ok(true) => ProbeOutcome::Reachable,
                Ok(false) => {
                    debug!(
                        "{}",
                        WardenError::TransientNetworkFailure(format!("{} unreachable", host))
                    );
                    ProbeOutcome::Unreachable
                }
                Err(_) => {
                    debug!("{} ({})", WardenError::ProbeTimeout(limit), host);
                    ProbeOutcome::TimedOut
                }
            }
        });

        ProbeOutcome::combine(join_all(checks).await)
    }

    pub async fn tick(&self, link: &dyn SupervisorLink) -> ProbeOutcome {
        let outcome = self.probe().await;
        match outcome.phase() {
            Some(phase) => self.apply(phase, link).await,
            None => debug!("Connectivity probe timed out, phase unchanged"),
        }
        outcome
    }

    async fn apply(&self, phase: ConnectivityPhase, link: &dyn SupervisorLink) {
        let previous = {
            let mut state = self.state.write();
            let previous = state.phase;
            if previous == Some(phase) {
                return;
            }
            state.phase = Some(phase);
            state.last_transition = Some(Utc::now());
            if previous.is_some() {
                state.transitions += 1;
            }
            previous
        };

        match previous {
            None => self
                .events
                .info(&format!("Initial connectivity phase: {}", phase)),
            Some(ConnectivityPhase::Online) => self
                .events
                .warn("Connectivity lost (online -> offline)"),
            Some(ConnectivityPhase::Offline) => {
                self.events.info("Connectivity restored (offline -> online)");
                self.on_restored(link).await;
            }
        }
    }

    async fn on_restored(&self, link: &dyn SupervisorLink) {
        let result = if link.status().state == ProcessState::Running {
            link.restart().await
        } else {
            link.start().await
        };

        match result {
            Ok(state) => debug!("Supervisor state after reconnect: {}", state),
            Err(e) => warn!("Supervisor action after reconnect failed: {}", e),
        }
    }

    pub async fn run(&self, link: Arc<dyn SupervisorLink>, mut cancel: CancellationToken) -> WardenResult<()> {
        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Connectivity monitor running every {:?} against {}",
            self.settings.interval,
            self.settings.hosts.join(", ")
        );

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

        info!("Connectivity monitor shutting down");
        Ok(())
    }
}
