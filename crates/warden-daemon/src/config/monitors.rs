use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::constants::DEFAULT_CONNECTIVITY_HOSTS;
use crate::monitors::{ConnectivitySettings, HealthSettings, SelfPingSettings};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub probe_timeout_secs: u64,
    /// `host:port` pairs probed over TCP.
    pub hosts: Vec<String>,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            probe_timeout_secs: 5,
            hosts: DEFAULT_CONNECTIVITY_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl ConnectivityConfig {
    pub fn settings(&self) -> ConnectivitySettings {
        ConnectivitySettings {
            interval: Duration::from_secs(self.interval_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            hosts: self.hosts.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub initial_delay_secs: u64,
    pub timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            initial_delay_secs: 60,
            timeout_secs: 10,
        }
    }
}

impl HealthConfig {
    pub fn settings(&self) -> HealthSettings {
        HealthSettings {
            interval: Duration::from_secs(self.interval_secs),
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            status_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPingConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub max_failures: u32,
    /// Externally reachable base URL. Defaults to the local API.
    pub target_url: Option<String>,
}

impl Default for SelfPingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 120,
            timeout_secs: 10,
            max_failures: 3,
            target_url: None,
        }
    }
}

impl SelfPingConfig {
    pub fn settings(&self, target_url: String) -> SelfPingSettings {
        SelfPingSettings {
            target_url,
            interval: Duration::from_secs(self.interval_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            max_failures: self.max_failures,
        }
    }
}
