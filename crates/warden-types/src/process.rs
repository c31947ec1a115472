use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Status as reported by an external process-management facility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Stopped,
    Unknown,
}

impl ProcessStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessStatus::Running)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Running => write!(f, "running"),
            ProcessStatus::Stopped => write!(f, "stopped"),
            ProcessStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Supervision lifecycle state.
///
/// `Failed` is transient: the supervisor applies it on entry to the failure
/// path and replaces it with `Starting` or `Fatal` before releasing its lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Failed,
    Fatal,
}

impl ProcessState {
    pub fn can_transition_to(&self, next: ProcessState) -> bool {
        use ProcessState::*;
        match (self, next) {
            (_, Stopped) => true,
            (Stopped, Starting) | (Fatal, Starting) => true,
            (Starting, Running) | (Starting, Failed) => true,
            (Running, Failed) => true,
            (Failed, Starting) | (Failed, Fatal) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Stopped => "stopped",
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::Failed => "failed",
            ProcessState::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisedProcess {
    pub id: String,
    pub state: ProcessState,
    pub restart_count: u32,
    pub last_transition: DateTime<Utc>,
    pub last_error: Option<String>,
    /// Bumped on every state transition and on every in-place restart.
    pub generation: u64,
}

impl SupervisedProcess {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: ProcessState::Stopped,
            restart_count: 0,
            last_transition: Utc::now(),
            last_error: None,
            generation: 0,
        }
    }

    /// Moves to `next`, returning `false` (and leaving the record untouched)
    /// when the edge is not part of the state machine.
    pub fn transition(&mut self, next: ProcessState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        self.last_transition = Utc::now();
        self.generation += 1;
        true
    }

    /// Records a restart that kept the process `Running`. Failure reports
    /// sampled before it become stale.
    pub fn mark_restarted(&mut self) {
        self.last_transition = Utc::now();
        self.generation += 1;
    }

    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }
}

/// Bounded-attempt, fixed-delay recovery rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartPolicy {
    pub max_attempts: u32,
    pub fixed_delay: Duration,
}

impl RestartPolicy {
    pub fn new(max_attempts: u32, fixed_delay: Duration) -> Self {
        Self { max_attempts, fixed_delay }
    }

    pub fn allows(&self, restart_count: u32) -> bool {
        restart_count <= self.max_attempts
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            fixed_delay: Duration::from_secs(5),
        }
    }
}

/// Why the failure path was entered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    StartFailure(String),
    RestartFailure(String),
    HealthCheck(ProcessStatus),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::StartFailure(e) => write!(f, "start-failure: {}", e),
            FailureReason::RestartFailure(e) => write!(f, "restart-failure: {}", e),
            FailureReason::HealthCheck(status) => {
                write!(f, "health-check-failure (status {})", status)
            }
        }
    }
}
