mod command;
mod memory;

pub use command::{CommandLine, CommandProcessManager, CommandSet};
pub use memory::InMemoryProcessManager;

use async_trait::async_trait;
use warden_types::{ProcessStatus, WardenResult};

/// Capability over an external process-management facility.
///
/// Only the supervisor calls the mutating operations; monitors are limited to
/// `status`.
#[async_trait]
pub trait ProcessManager: Send + Sync {
    async fn start(&self, id: &str) -> WardenResult<()>;

    async fn stop(&self, id: &str) -> WardenResult<()>;

    async fn restart(&self, id: &str) -> WardenResult<()>;

    async fn status(&self, id: &str) -> ProcessStatus;

    /// Force-terminate after a stop did not take effect in time.
    async fn kill(&self, id: &str) -> WardenResult<()> {
        self.stop(id).await
    }
}
