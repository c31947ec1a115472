use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::constants::DEFAULT_EVENT_LOG;
use super::types::LogLevel;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Diagnostic tracing output file, in addition to stderr.
    pub file: Option<PathBuf>,
    pub json: bool,
    /// Append-only supervision event log.
    pub event_log: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            json: false,
            event_log: PathBuf::from(DEFAULT_EVENT_LOG),
        }
    }
}
