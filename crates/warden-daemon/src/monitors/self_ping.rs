use chrono::Utc;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use warden_types::{PingRecord, SelfPingStatus, WardenError, WardenResult, PING_BODY, PING_PATH};

use crate::event_log::EventLog;
use crate::supervisor::CancellationToken;

const PING_HISTORY: usize = 64;

#[derive(Clone, Debug)]
pub struct SelfPingSettings {
    /// Base URL of the externally reachable API, without the `/ping` path.
    pub target_url: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub max_failures: u32,
}

impl SelfPingSettings {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            interval: Duration::from_secs(120),
            timeout: Duration::from_secs(10),
            max_failures: 3,
        }
    }
}

#[derive(Default)]
struct PingState {
    sequence: u64,
    ping_count: u64,
    consecutive_failures: u32,
    last_ping_time: Option<chrono::DateTime<Utc>>,
    alerted: bool,
    history: VecDeque<PingRecord>,
}

/// Keeps the hosting platform from idling the service out by calling our own
/// `/ping`. Alert-only: it has no restart authority.
pub struct SelfPingLoop {
    client: Client,
    settings: SelfPingSettings,
    events: EventLog,
    state: Mutex<PingState>,
    running: AtomicBool,
}

impl SelfPingLoop {
    pub fn new(settings: SelfPingSettings, events: EventLog) -> WardenResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| WardenError::Network(format!("Failed to build self-ping client: {}", e)))?;

        Ok(Self {
            client,
            settings,
            events,
            state: Mutex::new(PingState::default()),
            running: AtomicBool::new(false),
        })
    }

    pub fn ping_url(&self) -> String {
        format!("{}{}", self.settings.target_url.trim_end_matches('/'), PING_PATH)
    }

    pub fn status(&self) -> SelfPingStatus {
        let state = self.state.lock();
        SelfPingStatus {
            is_running: self.running.load(Ordering::SeqCst),
            ping_count: state.ping_count,
            last_ping_time: state.last_ping_time,
            consecutive_failures: state.consecutive_failures,
            target_url: self.ping_url(),
        }
    }

    /// Most recent pings, oldest first.
    pub fn history(&self) -> Vec<PingRecord> {
        self.state.lock().history.iter().copied().collect()
    }

    /// A single GET. Success means status 200 with body exactly `pong`.
    pub async fn ping(&self) -> WardenResult<()> {
        let response = self
            .client
            .get(self.ping_url())
            .send()
            .await
            .map_err(|e| WardenError::SelfPingFailure(format!("request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WardenError::SelfPingFailure(format!("unexpected status {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WardenError::SelfPingFailure(format!("unreadable body: {}", e)))?;
        if body != PING_BODY {
            return Err(WardenError::SelfPingFailure(format!("unexpected body {:?}", body)));
        }

        Ok(())
    }

    pub async fn tick(&self) -> bool {
        let result = self.ping().await;

        let mut state = self.state.lock();
        state.sequence += 1;
        let record = PingRecord {
            sequence: state.sequence,
            timestamp: Utc::now(),
            success: result.is_ok(),
        };
        if state.history.len() == PING_HISTORY {
            state.history.pop_front();
        }
        state.history.push_back(record);

        match result {
            Ok(()) => {
                state.ping_count += 1;
                state.consecutive_failures = 0;
                state.last_ping_time = Some(record.timestamp);
                state.alerted = false;
                debug!("Self-ping #{} ok", state.ping_count);
                true
            }
            Err(e) => {
                state.consecutive_failures += 1;
                let failures = state.consecutive_failures;
                let raise = failures >= self.settings.max_failures && !state.alerted;
                if raise {
                    state.alerted = true;
                }
                drop(state);

                self.events.warn(&format!(
                    "Self-ping failed ({}/{}): {}",
                    failures, self.settings.max_failures, e
                ));
                if raise {
                    self.events.alert(&format!(
                        "Self-ping to {} failed {} times in a row; the service may be unreachable",
                        self.ping_url(),
                        failures
                    ));
                }
                false
            }
        }
    }

    pub async fn run(&self, mut cancel: CancellationToken) -> WardenResult<()> {
        self.running.store(true, Ordering::SeqCst);
        info!(
            "Self-ping running every {:?} against {}",
            self.settings.interval,
            self.ping_url()
        );

        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if cancel.run_until_cancelled(self.tick()).await.is_none() {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Self-ping shutting down");
        Ok(())
    }
}
