use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use warden_types::{WardenError, WardenResult};

use super::api::ApiConfig;
use super::logging::LoggingConfig;
use super::monitors::{ConnectivityConfig, HealthConfig, SelfPingConfig};
use super::process::ProcessConfig;
use super::restart::RestartConfig;
use super::types::{LogLevel, ManagerKind};
use crate::supervisor::SupervisorConfig;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub process: ProcessConfig,
    pub restart: RestartConfig,
    pub connectivity: ConnectivityConfig,
    pub health: HealthConfig,
    pub self_ping: SelfPingConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

impl WardenConfig {
    pub fn load(path: impl AsRef<Path>) -> WardenResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| WardenError::Config(format!("Failed to read config: {}", e)))?;
            Self::from_toml(&contents)?
        } else {
            info!("Config file {:?} not found, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> WardenResult<Self> {
        toml::from_str(contents)
            .map_err(|e| WardenError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn to_toml(&self) -> WardenResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| WardenError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> WardenResult<()> {
        let contents = self.to_toml()?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| WardenError::Config(format!("Failed to create config dir: {}", e)))?;
            }
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| WardenError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in ["PORT", "WARDEN_API_PORT"] {
            if let Some(port) = lookup(key) {
                match port.parse() {
                    Ok(p) => self.api.port = p,
                    Err(_) => warn!("Ignoring invalid {}={}", key, port),
                }
            }
        }

        if let Some(bind) = lookup("WARDEN_API_BIND") {
            match bind.parse() {
                Ok(addr) => {
                    self.api.bind_address = addr;
                    if bind != "127.0.0.1" && bind != "::1" {
                        warn!(
                            "API server binding to non-localhost address: {}. Ensure proper firewall rules.",
                            bind
                        );
                    }
                }
                Err(_) => warn!("Ignoring invalid WARDEN_API_BIND={}", bind),
            }
        }

        if let Some(id) = lookup("WARDEN_PROCESS_ID") {
            self.process.id = id;
        }

        if let Some(url) = lookup("WARDEN_SELF_PING_URL") {
            self.self_ping.target_url = Some(url);
        }

        if let Some(level) = lookup("WARDEN_LOG_LEVEL") {
            self.logging.level = LogLevel::parse_lossy(&level);
        }

        if lookup("WARDEN_LOG_JSON").is_some() {
            self.logging.json = true;
        }

        if let Some(max) = lookup("WARDEN_MAX_ATTEMPTS") {
            match max.parse() {
                Ok(m) => self.restart.max_attempts = m,
                Err(_) => warn!("Ignoring invalid WARDEN_MAX_ATTEMPTS={}", max),
            }
        }
    }

    pub fn validate(&self) -> WardenResult<()> {
        if self.process.id.trim().is_empty() {
            return Err(WardenError::Config("process.id cannot be empty".into()));
        }

        if self.process.manager == ManagerKind::Command {
            self.process.command_set()?;
        }

        if self.restart.shutdown_grace_secs == 0 {
            return Err(WardenError::Config("restart.shutdown_grace_secs must be > 0".into()));
        }
        if self.restart.monitor_restart_delay_secs == 0 {
            return Err(WardenError::Config(
                "restart.monitor_restart_delay_secs must be > 0".into(),
            ));
        }

        if self.connectivity.enabled {
            if self.connectivity.interval_secs == 0 || self.connectivity.probe_timeout_secs == 0 {
                return Err(WardenError::Config(
                    "connectivity intervals must be > 0".into(),
                ));
            }
            if self.connectivity.hosts.is_empty() {
                return Err(WardenError::Config(
                    "connectivity is enabled but no hosts are configured".into(),
                ));
            }
        }

        if self.health.enabled && (self.health.interval_secs == 0 || self.health.timeout_secs == 0) {
            return Err(WardenError::Config("health intervals must be > 0".into()));
        }

        if self.self_ping.enabled {
            if self.self_ping.interval_secs == 0 || self.self_ping.timeout_secs == 0 {
                return Err(WardenError::Config("self_ping intervals must be > 0".into()));
            }
            if self.self_ping.max_failures == 0 {
                return Err(WardenError::Config("self_ping.max_failures must be >= 1".into()));
            }
            if self.self_ping.target_url.is_none() && !self.api.enabled {
                return Err(WardenError::Config(
                    "self_ping needs target_url when the API is disabled".into(),
                ));
            }
            let target = self.self_ping_target();
            reqwest::Url::parse(&target).map_err(|e| {
                WardenError::Config(format!("Invalid self_ping target {:?}: {}", target, e))
            })?;
        }

        if self.api.enabled && self.api.port == 0 {
            return Err(WardenError::Config("API port cannot be 0".into()));
        }

        Ok(())
    }

    pub fn api_addr(&self) -> SocketAddr {
        SocketAddr::new(self.api.bind_address, self.api.port)
    }

    /// Base URL the self-ping loop calls. Falls back to the local API.
    pub fn self_ping_target(&self) -> String {
        match &self.self_ping.target_url {
            Some(url) => url.clone(),
            None => format!("http://{}", self.local_api_addr()),
        }
    }

    /// Address a local client should use to reach the API; unspecified bind
    /// addresses are replaced by loopback.
    pub fn local_api_addr(&self) -> SocketAddr {
        let mut addr = self.api_addr();
        if addr.ip().is_unspecified() {
            addr.set_ip(match addr {
                SocketAddr::V4(_) => std::net::Ipv4Addr::LOCALHOST.into(),
                SocketAddr::V6(_) => std::net::Ipv6Addr::LOCALHOST.into(),
            });
        }
        addr
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        let mut config = SupervisorConfig::new(self.process.id.clone(), self.restart.policy());
        config.shutdown_grace = Duration::from_secs(self.restart.shutdown_grace_secs);
        config.start_verify_delay = Duration::from_secs(self.process.start_verify_delay_secs);
        config.monitor_restart_delay = Duration::from_secs(self.restart.monitor_restart_delay_secs);
        config
    }
}
