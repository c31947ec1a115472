use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use warden_types::{WardenError, WardenResult};

/// Append-only event sink. Implementations must tolerate concurrent writers.
pub trait LogSink: Send + Sync {
    fn append(&self, line: &str) -> WardenResult<()>;
}

pub fn format_line(message: &str) -> String {
    format!(
        "[{}] {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        message
    )
}

pub struct FileLogSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileLogSink {
    pub fn open(path: impl AsRef<Path>) -> WardenResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    WardenError::Config(format!("Failed to create log directory {:?}: {}", parent, e))
                })?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileLogSink {
    fn append(&self, line: &str) -> WardenResult<()> {
        let mut entry = format_line(line);
        entry.push('\n');
        let mut file = self.file.lock();
        file.write_all(entry.as_bytes())?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines.lock().iter().filter(|l| l.contains(needle)).count()
    }
}

impl LogSink for MemoryLogSink {
    fn append(&self, line: &str) -> WardenResult<()> {
        self.lines.lock().push(format_line(line));
        Ok(())
    }
}

pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn append(&self, _line: &str) -> WardenResult<()> {
        Ok(())
    }
}

/// Writes supervision events to the sink and mirrors them to `tracing`.
#[derive(Clone)]
pub struct EventLog {
    sink: Arc<dyn LogSink>,
}

impl EventLog {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NullLogSink))
    }

    pub fn info(&self, message: &str) {
        info!("{}", message);
        self.write(message);
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", message);
        self.write(message);
    }

    pub fn alert(&self, message: &str) {
        error!("{}", message);
        self.write(&format!("ALERT: {}", message));
    }

    fn write(&self, message: &str) {
        if let Err(e) = self.sink.append(message) {
            // The sink is best effort; tracing still carries the event.
            warn!("Failed to append to event log: {}", e);
        }
    }
}
