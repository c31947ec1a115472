use serde::{Deserialize, Serialize};
use std::time::Duration;
use warden_types::RestartPolicy;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartConfig {
    pub max_attempts: u32,
    pub fixed_delay_secs: u64,
    pub shutdown_grace_secs: u64,
    /// How often exited monitors are respawned while supervising.
    pub monitor_restart_delay_secs: u64,
}

impl Default for RestartConfig {
    fn default() -> Self {
        let policy = RestartPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            fixed_delay_secs: policy.fixed_delay.as_secs(),
            shutdown_grace_secs: crate::supervisor::DEFAULT_SHUTDOWN_GRACE_SECS,
            monitor_restart_delay_secs: crate::supervisor::DEFAULT_MONITOR_RESTART_DELAY_SECS,
        }
    }
}

impl RestartConfig {
    pub fn policy(&self) -> RestartPolicy {
        RestartPolicy::new(self.max_attempts, Duration::from_secs(self.fixed_delay_secs))
    }
}
