mod connectivity;
mod health;
mod self_ping;

pub use connectivity::{
    ConnectivityMonitor, ConnectivitySettings, ProbeOutcome, ReachabilityProbe,
    TcpReachabilityProbe,
};
pub use health::{HealthChecker, HealthSettings};
pub use self_ping::{SelfPingLoop, SelfPingSettings};

#[cfg(test)]
mod tests;
