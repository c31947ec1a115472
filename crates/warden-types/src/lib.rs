#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod error;
mod monitor;
mod process;

pub use error::{WardenError, WardenResult};
pub use monitor::{
    ConnectivityPhase, ConnectivityState, HealthCheckResult, PingRecord, SelfPingStatus,
};
pub use process::{
    FailureReason, ProcessState, ProcessStatus, RestartPolicy, SupervisedProcess,
};

pub const DEFAULT_PROCESS_ID: &str = "discord-bot";

pub const DEFAULT_API_PORT: u16 = 3000;

pub const PING_PATH: &str = "/ping";

pub const PING_BODY: &str = "pong";

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_state_machine_edges() {
        use ProcessState::*;
        assert!(Stopped.can_transition_to(Starting));
        assert!(Starting.can_transition_to(Running));
        assert!(Running.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Starting));
        assert!(Failed.can_transition_to(Fatal));
        assert!(Fatal.can_transition_to(Starting));

        assert!(!Running.can_transition_to(Starting));
        assert!(!Fatal.can_transition_to(Running));
        assert!(!Stopped.can_transition_to(Running));
        assert!(!Starting.can_transition_to(Fatal));

        for state in [Stopped, Starting, Running, Failed, Fatal] {
            assert!(state.can_transition_to(Stopped));
        }
    }

    #[test]
    fn test_supervised_process_transition() {
        let mut process = SupervisedProcess::new("bot");
        assert_eq!(process.state, ProcessState::Stopped);
        assert_eq!(process.generation, 0);

        assert!(!process.transition(ProcessState::Running));
        assert_eq!(process.state, ProcessState::Stopped);
        assert_eq!(process.generation, 0);

        assert!(process.transition(ProcessState::Starting));
        assert!(process.transition(ProcessState::Running));
        assert!(process.is_running());
        assert_eq!(process.generation, 2);
    }

    #[test]
    fn test_restart_policy_allows() {
        let policy = RestartPolicy::new(3, Duration::from_secs(5));
        assert!(policy.allows(1));
        assert!(policy.allows(3));
        assert!(!policy.allows(4));
    }

    #[test]
    fn test_failure_reason_display() {
        let reason = FailureReason::HealthCheck(ProcessStatus::Stopped);
        assert_eq!(reason.to_string(), "health-check-failure (status stopped)");
    }

    #[test]
    fn test_health_check_result_from_status() {
        let ok = HealthCheckResult::from_status(ProcessStatus::Running);
        assert!(ok.healthy);

        let bad = HealthCheckResult::from_status(ProcessStatus::Unknown);
        assert!(!bad.healthy);
        assert_eq!(bad.status, ProcessStatus::Unknown);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&ProcessState::Fatal).unwrap();
        assert_eq!(json, "\"fatal\"");
        let phase: ConnectivityPhase = serde_json::from_str("\"offline\"").unwrap();
        assert_eq!(phase, ConnectivityPhase::Offline);
    }

    #[test]
    fn test_error_messages() {
        let err = WardenError::start_failure("bot", "exit code 1");
        assert_eq!(err.to_string(), "Failed to start process 'bot': exit code 1");

        let err = WardenError::policy_exhausted("bot", 3);
        assert!(matches!(err, WardenError::PolicyExhausted { attempts: 3, .. }));
        assert_eq!(err.to_string(), "Restart policy exhausted for 'bot' after 3 attempts");
    }

    #[test]
    fn test_mark_restarted_bumps_generation() {
        let mut process = SupervisedProcess::new("bot");
        process.transition(ProcessState::Starting);
        process.transition(ProcessState::Running);
        let before = process.generation;

        process.mark_restarted();
        assert_eq!(process.state, ProcessState::Running);
        assert_eq!(process.generation, before + 1);
    }
}
