use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use warden_types::{WardenError, WardenResult};

use super::constants::{DEFAULT_ECOSYSTEM_FILE, DEFAULT_PROCESS_ID};
use super::types::ManagerKind;
use crate::process::{
    CommandLine, CommandProcessManager, CommandSet, InMemoryProcessManager, ProcessManager,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub id: String,
    pub manager: ManagerKind,
    pub ecosystem_file: String,
    pub working_dir: Option<PathBuf>,
    /// Custom command lines for `manager = "command"`; `{id}` is substituted.
    pub start: Vec<String>,
    pub stop: Vec<String>,
    pub restart: Vec<String>,
    pub status: Vec<String>,
    pub kill: Vec<String>,
    pub running_marker: String,
    pub command_timeout_secs: u64,
    pub start_verify_delay_secs: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_PROCESS_ID.to_string(),
            manager: ManagerKind::Pm2,
            ecosystem_file: DEFAULT_ECOSYSTEM_FILE.to_string(),
            working_dir: None,
            start: vec![],
            stop: vec![],
            restart: vec![],
            status: vec![],
            kill: vec![],
            running_marker: "online".to_string(),
            command_timeout_secs: 30,
            start_verify_delay_secs: 5,
        }
    }
}

impl ProcessConfig {
    pub fn command_set(&self) -> WardenResult<CommandSet> {
        let mut commands = match self.manager {
            ManagerKind::Pm2 => CommandSet::pm2(&self.ecosystem_file),
            ManagerKind::Command => CommandSet {
                start: parse_command("start", &self.start)?,
                stop: parse_command("stop", &self.stop)?,
                restart: parse_command("restart", &self.restart)?,
                status: parse_command("status", &self.status)?,
                kill: if self.kill.is_empty() {
                    None
                } else {
                    Some(parse_command("kill", &self.kill)?)
                },
                running_marker: self.running_marker.clone(),
            },
            ManagerKind::Memory => {
                return Err(WardenError::Config(
                    "The memory manager has no command set".into(),
                ))
            }
        };
        commands.running_marker = self.running_marker.clone();
        Ok(commands)
    }

    pub fn build_manager(&self) -> WardenResult<Arc<dyn ProcessManager>> {
        match self.manager {
            ManagerKind::Memory => Ok(Arc::new(InMemoryProcessManager::new())),
            ManagerKind::Pm2 | ManagerKind::Command => {
                let mut manager = CommandProcessManager::new(
                    self.command_set()?,
                    Duration::from_secs(self.command_timeout_secs),
                );
                if let Some(dir) = &self.working_dir {
                    manager = manager.with_working_dir(dir.clone());
                }
                Ok(Arc::new(manager))
            }
        }
    }
}

fn parse_command(name: &str, parts: &[String]) -> WardenResult<CommandLine> {
    CommandLine::parse(parts)
        .map_err(|e| WardenError::Config(format!("process.{}: {}", name, e)))
}
