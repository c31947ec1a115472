use serde::Serialize;
use uuid::Uuid;
use warden_types::ProcessState;

#[derive(Clone, Debug, Serialize)]
pub struct MonitorMetrics {
    pub name: String,
    pub running: bool,
    pub restarts: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct SupervisorStats {
    pub session_id: Uuid,
    pub process_id: String,
    pub state: ProcessState,
    pub restart_count: u32,
    pub max_attempts: u32,
    pub total_start_calls: u64,
    pub total_defensive_restarts: u64,
    pub total_failures: u64,
    pub total_recoveries: u64,
    pub process_uptime_secs: u64,
    pub supervisor_uptime_secs: u64,
    pub monitors: Vec<MonitorMetrics>,
}
