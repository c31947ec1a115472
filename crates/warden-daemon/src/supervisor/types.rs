use std::time::Duration;
use warden_types::RestartPolicy;

pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
pub const DEFAULT_MONITOR_RESTART_DELAY_SECS: u64 = 5;
pub const STOP_POLL_INTERVAL_MS: u64 = 250;

#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    pub process_id: String,
    pub policy: RestartPolicy,
    /// Bound on monitor shutdown and on waiting for the process to exit.
    pub shutdown_grace: Duration,
    /// Zero disables the post-start status verification.
    pub start_verify_delay: Duration,
    /// How often exited monitors are looked for and respawned.
    pub monitor_restart_delay: Duration,
}

impl SupervisorConfig {
    pub fn new(process_id: impl Into<String>, policy: RestartPolicy) -> Self {
        Self {
            process_id: process_id.into(),
            policy,
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            start_verify_delay: Duration::ZERO,
            monitor_restart_delay: Duration::from_secs(DEFAULT_MONITOR_RESTART_DELAY_SECS),
        }
    }
}

/// Who asked for a start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartTrigger {
    /// Operator or program entry point. May re-arm `Fatal`.
    External,
    /// A monitor reporting recovered connectivity. Never re-arms `Fatal` and
    /// never overrides an explicit stop.
    Monitor,
}

impl std::fmt::Display for StartTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartTrigger::External => write!(f, "external"),
            StartTrigger::Monitor => write!(f, "monitor"),
        }
    }
}
