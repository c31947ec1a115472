mod cancellation;
mod core;
mod link;
mod stats;
mod types;

pub use cancellation::CancellationToken;
pub use core::Supervisor;
pub use link::SupervisorLink;
pub use stats::{MonitorMetrics, SupervisorStats};
pub use types::*;
