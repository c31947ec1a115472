#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod event_log;
pub mod monitors;
pub mod process;
pub mod supervisor;

pub use api::{router, ApiServer, ApiState};
pub use config::{
    ApiConfig, ConnectivityConfig, HealthConfig, LogLevel, LoggingConfig, ManagerKind,
    ProcessConfig, RestartConfig, SelfPingConfig, WardenConfig, DEFAULT_CONFIG_FILE,
    DEFAULT_EVENT_LOG, DEFAULT_PID_FILE,
};
pub use event_log::{EventLog, FileLogSink, LogSink, MemoryLogSink, NullLogSink};
pub use monitors::{
    ConnectivityMonitor, ConnectivitySettings, HealthChecker, HealthSettings, ProbeOutcome,
    ReachabilityProbe, SelfPingLoop, SelfPingSettings, TcpReachabilityProbe,
};
pub use process::{
    CommandLine, CommandProcessManager, CommandSet, InMemoryProcessManager, ProcessManager,
};
pub use supervisor::{
    CancellationToken, StartTrigger, Supervisor, SupervisorConfig, SupervisorLink,
    SupervisorStats,
};
