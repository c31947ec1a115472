use async_trait::async_trait;
use warden_types::{FailureReason, ProcessState, SupervisedProcess, WardenResult};

/// The narrow interface monitors use to reach the supervisor.
///
/// Monitors report outcomes through it; all lifecycle decisions stay with the
/// implementor.
#[async_trait]
pub trait SupervisorLink: Send + Sync {
    fn status(&self) -> SupervisedProcess;

    /// Start on behalf of a monitor. Must not re-arm a fatal process.
    async fn start(&self) -> WardenResult<ProcessState>;

    /// Defensive restart of a running process.
    async fn restart(&self) -> WardenResult<ProcessState>;

    async fn handle_failure(&self, reason: FailureReason) -> ProcessState;

    /// Failure report for an observation taken while the process was at
    /// `observed_generation`. Dropped if the process has moved on since.
    async fn report_failure(&self, reason: FailureReason, observed_generation: u64) -> ProcessState;

    async fn report_healthy(&self);
}
