use crate::process::ProcessStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityPhase {
    Online,
    Offline,
}

impl fmt::Display for ConnectivityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityPhase::Online => write!(f, "online"),
            ConnectivityPhase::Offline => write!(f, "offline"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityState {
    /// `None` until the first definitive probe result.
    pub phase: Option<ConnectivityPhase>,
    pub last_transition: Option<DateTime<Utc>>,
    pub transitions: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub timestamp: DateTime<Utc>,
    pub healthy: bool,
    pub status: ProcessStatus,
}

impl HealthCheckResult {
    pub fn from_status(status: ProcessStatus) -> Self {
        Self {
            timestamp: Utc::now(),
            healthy: status.is_running(),
            status,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfPingStatus {
    pub is_running: bool,
    pub ping_count: u64,
    pub last_ping_time: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub target_url: String,
}
