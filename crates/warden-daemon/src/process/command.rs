use super::ProcessManager;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use warden_types::{ProcessStatus, WardenError, WardenResult};

const ID_PLACEHOLDER: &str = "{id}";

/// A program plus arguments; `{id}` in any argument is replaced by the
/// process id at invocation time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn parse(parts: &[String]) -> WardenResult<Self> {
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| WardenError::Config("Empty command line".into()))?;
        if program.trim().is_empty() {
            return Err(WardenError::Config("Command program cannot be empty".into()));
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn render(&self, id: &str) -> Vec<String> {
        self.args.iter().map(|a| a.replace(ID_PLACEHOLDER, id)).collect()
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct CommandSet {
    pub start: CommandLine,
    pub stop: CommandLine,
    pub restart: CommandLine,
    pub status: CommandLine,
    pub kill: Option<CommandLine>,
    /// Substring of the status command's stdout that means "running".
    pub running_marker: String,
}

impl CommandSet {
    pub fn pm2(ecosystem_file: &str) -> Self {
        Self {
            start: CommandLine::new("pm2", &["start", ecosystem_file]),
            stop: CommandLine::new("pm2", &["stop", ID_PLACEHOLDER]),
            restart: CommandLine::new("pm2", &["restart", ID_PLACEHOLDER]),
            status: CommandLine::new("pm2", &["status", ID_PLACEHOLDER]),
            kill: Some(CommandLine::new("pm2", &["delete", ID_PLACEHOLDER])),
            running_marker: "online".to_string(),
        }
    }
}

/// Drives an external manager (pm2 by default) through its command line.
pub struct CommandProcessManager {
    commands: CommandSet,
    working_dir: Option<PathBuf>,
    timeout: Duration,
}

impl CommandProcessManager {
    pub fn new(commands: CommandSet, timeout: Duration) -> Self {
        Self {
            commands,
            working_dir: None,
            timeout,
        }
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    async fn execute(&self, line: &CommandLine, id: &str) -> WardenResult<String> {
        let args = line.render(id);
        debug!("Executing: {} {}", line.program, args.join(" "));

        let mut command = Command::new(&line.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                WardenError::ProcessManager(format!(
                    "'{}' timed out after {:?}",
                    line, self.timeout
                ))
            })?
            .map_err(|e| WardenError::ProcessManager(format!("Failed to spawn '{}': {}", line, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WardenError::ProcessManager(format!(
                "'{}' exited with {}: {}",
                line,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ProcessManager for CommandProcessManager {
    async fn start(&self, id: &str) -> WardenResult<()> {
        self.execute(&self.commands.start, id)
            .await
            .map(|_| ())
            .map_err(|e| WardenError::start_failure(id, e))
    }

    async fn stop(&self, id: &str) -> WardenResult<()> {
        self.execute(&self.commands.stop, id).await.map(|_| ())
    }

    async fn restart(&self, id: &str) -> WardenResult<()> {
        self.execute(&self.commands.restart, id)
            .await
            .map(|_| ())
            .map_err(|e| WardenError::start_failure(id, e))
    }

    async fn status(&self, id: &str) -> ProcessStatus {
        match self.execute(&self.commands.status, id).await {
            Ok(stdout) if stdout.contains(&self.commands.running_marker) => ProcessStatus::Running,
            Ok(_) => ProcessStatus::Stopped,
            Err(e) => {
                warn!("Status query for '{}' failed: {}", id, e);
                ProcessStatus::Unknown
            }
        }
    }

    async fn kill(&self, id: &str) -> WardenResult<()> {
        match self.commands.kill {
            Some(ref kill) => self.execute(kill, id).await.map(|_| ()),
            None => self.stop(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(parts: &[&str]) -> CommandLine {
        CommandLine::parse(&parts.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_pm2_preset_renders_id() {
        let set = CommandSet::pm2("ecosystem.config.js");
        assert_eq!(set.start.render("bot"), vec!["start", "ecosystem.config.js"]);
        assert_eq!(set.restart.render("bot"), vec!["restart", "bot"]);
        assert_eq!(set.status.to_string(), "pm2 status {id}");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(CommandLine::parse(&[]).is_err());
        assert!(CommandLine::parse(&[" ".to_string()]).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_status_uses_running_marker() {
        let set = CommandSet {
            start: line(&["true"]),
            stop: line(&["true"]),
            restart: line(&["true"]),
            status: line(&["echo", "{id} online"]),
            kill: None,
            running_marker: "online".into(),
        };
        let manager = CommandProcessManager::new(set, Duration::from_secs(5));
        assert_eq!(manager.status("bot").await, ProcessStatus::Running);
        assert!(manager.start("bot").await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_command_maps_errors() {
        let set = CommandSet {
            start: line(&["false"]),
            stop: line(&["false"]),
            restart: line(&["false"]),
            status: line(&["false"]),
            kill: None,
            running_marker: "online".into(),
        };
        let manager = CommandProcessManager::new(set, Duration::from_secs(5));
        assert_eq!(manager.status("bot").await, ProcessStatus::Unknown);
        assert!(matches!(
            manager.start("bot").await,
            Err(WardenError::ProcessStartFailure { .. })
        ));
        assert!(manager.kill("bot").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_status_without_marker_is_stopped() {
        let set = CommandSet {
            start: line(&["true"]),
            stop: line(&["true"]),
            restart: line(&["true"]),
            status: line(&["echo", "stopped"]),
            kill: None,
            running_marker: "online".into(),
        };
        let manager = CommandProcessManager::new(set, Duration::from_secs(5));
        assert_eq!(manager.status("bot").await, ProcessStatus::Stopped);
    }
}
