use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_types::{
    ConnectivityState, HealthCheckResult, ProcessState, SelfPingStatus, SupervisedProcess,
};

use crate::supervisor::SupervisorStats;

pub const SERVICE_NAME: &str = "Warden Keep-Alive Server";

/// `online` for a running process, otherwise the lowercase state name.
pub fn bot_status(state: ProcessState) -> String {
    match state {
        ProcessState::Running => "online".to_string(),
        other => other.as_str().to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_rss_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Seconds since the daemon started.
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub bot: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    pub ping: String,
    pub health: String,
    pub status: String,
    pub supervisor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub endpoints: Endpoints,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupervisorResponse {
    pub process: SupervisedProcess,
    pub stats: SupervisorStats,
    pub connectivity: Option<ConnectivityState>,
    pub last_health_check: Option<HealthCheckResult>,
    pub self_ping: Option<SelfPingStatus>,
}
