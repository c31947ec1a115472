use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardenError {
    #[error("Transient network failure: {0}")]
    TransientNetworkFailure(String),

    #[error("Failed to start process '{id}': {reason}")]
    ProcessStartFailure { id: String, reason: String },

    #[error("Restart policy exhausted for '{id}' after {attempts} attempts")]
    PolicyExhausted { id: String, attempts: u32 },

    #[error("Probe timed out after {0:?}")]
    ProbeTimeout(Duration),

    #[error("Self-ping failed: {0}")]
    SelfPingFailure(String),

    #[error("Process manager error: {0}")]
    ProcessManager(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    pub fn start_failure(id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        WardenError::ProcessStartFailure {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn policy_exhausted(id: impl Into<String>, attempts: u32) -> Self {
        WardenError::PolicyExhausted {
            id: id.into(),
            attempts,
        }
    }
}

pub type WardenResult<T> = Result<T, WardenError>;
