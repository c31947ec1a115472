mod api;
mod constants;
mod logging;
mod monitors;
mod process;
mod restart;
mod types;
mod warden;

pub use api::ApiConfig;
pub use constants::*;
pub use logging::LoggingConfig;
pub use monitors::{ConnectivityConfig, HealthConfig, SelfPingConfig};
pub use process::ProcessConfig;
pub use restart::RestartConfig;
pub use types::*;
pub use warden::WardenConfig;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_validation() {
        let config = WardenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.process.id, "discord-bot");
        assert_eq!(config.restart.max_attempts, 5);
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.self_ping_target(), "http://127.0.0.1:3000");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = WardenConfig::from_toml(
            r#"
            [process]
            id = "forex-bot"

            [restart]
            max_attempts = 3
            fixed_delay_secs = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.process.id, "forex-bot");
        assert_eq!(config.process.manager, ManagerKind::Pm2);
        assert_eq!(config.restart.policy().max_attempts, 3);
        assert_eq!(config.restart.policy().fixed_delay, Duration::from_secs(2));
        assert_eq!(config.connectivity.hosts.len(), 2);
        assert_eq!(config.health.initial_delay_secs, 60);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = WardenConfig::default();
        config.self_ping.target_url = Some("https://bot.example.com".into());
        let text = config.to_toml().unwrap();
        let parsed = WardenConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.self_ping.target_url, config.self_ping.target_url);
        assert_eq!(parsed.api.bind_address, config.api.bind_address);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = WardenConfig::default();
        config.apply_overrides(overrides(&[
            ("PORT", "8080"),
            ("WARDEN_PROCESS_ID", "worker"),
            ("WARDEN_LOG_LEVEL", "DEBUG"),
            ("WARDEN_LOG_JSON", "1"),
            ("WARDEN_MAX_ATTEMPTS", "9"),
            ("WARDEN_SELF_PING_URL", "https://worker.example.com"),
        ]));

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.process.id, "worker");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.json);
        assert_eq!(config.restart.max_attempts, 9);
        assert_eq!(config.self_ping_target(), "https://worker.example.com");
    }

    #[test]
    fn test_warden_port_wins_over_port() {
        let mut config = WardenConfig::default();
        config.apply_overrides(overrides(&[("PORT", "8080"), ("WARDEN_API_PORT", "9090")]));
        assert_eq!(config.api.port, 9090);
    }

    #[test]
    fn test_invalid_override_ignored() {
        let mut config = WardenConfig::default();
        config.apply_overrides(overrides(&[("PORT", "not-a-port"), ("WARDEN_API_BIND", "nope")]));
        assert_eq!(config.api.port, DEFAULT_API_PORT);
        assert!(config.api.bind_address.is_loopback());
    }

    #[test]
    fn test_zero_max_failures_rejected() {
        let mut config = WardenConfig::default();
        config.self_ping.max_failures = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connectivity_without_hosts() {
        let mut config = WardenConfig::default();
        config.connectivity.hosts.clear();
        assert!(config.validate().is_err());

        config.connectivity.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_self_ping_url() {
        let mut config = WardenConfig::default();
        config.self_ping.target_url = Some("not a url".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_command_manager_requires_commands() {
        let mut config = WardenConfig::default();
        config.process.manager = ManagerKind::Command;
        assert!(config.validate().is_err());

        config.process.start = vec!["systemctl".into(), "start".into(), "{id}".into()];
        config.process.stop = vec!["systemctl".into(), "stop".into(), "{id}".into()];
        config.process.restart = vec!["systemctl".into(), "restart".into(), "{id}".into()];
        config.process.status = vec!["systemctl".into(), "is-active".into(), "{id}".into()];
        config.process.running_marker = "active".into();
        assert!(config.validate().is_ok());

        let commands = config.process.command_set().unwrap();
        assert_eq!(commands.start.render("bot"), vec!["start", "bot"]);
        assert!(commands.kill.is_none());
        assert_eq!(commands.running_marker, "active");
    }

    #[test]
    fn test_pm2_command_set() {
        let config = WardenConfig::default();
        let commands = config.process.command_set().unwrap();
        assert_eq!(commands.start.program, "pm2");
        assert_eq!(commands.start.args, vec!["start", "ecosystem.config.js"]);
        assert_eq!(commands.status.render("discord-bot"), vec!["status", "discord-bot"]);
    }

    #[test]
    fn test_supervisor_config_mapping() {
        let mut config = WardenConfig::default();
        config.restart.shutdown_grace_secs = 9;
        config.restart.monitor_restart_delay_secs = 12;
        config.process.start_verify_delay_secs = 0;

        let supervisor = config.supervisor_config();
        assert_eq!(supervisor.process_id, "discord-bot");
        assert_eq!(supervisor.shutdown_grace, Duration::from_secs(9));
        assert_eq!(supervisor.monitor_restart_delay, Duration::from_secs(12));
        assert!(supervisor.start_verify_delay.is_zero());

        config.restart.monitor_restart_delay_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unspecified_bind_uses_loopback_for_self_ping() {
        let mut config = WardenConfig::default();
        config.api.bind_address = "0.0.0.0".parse().unwrap();
        assert_eq!(config.self_ping_target(), "http://127.0.0.1:3000");
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("warden-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("warden.toml");

        let mut config = WardenConfig::default();
        config.process.id = "saved".into();
        config.save(&path).unwrap();

        let loaded = WardenConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.process.id, "saved");

        let _ = std::fs::remove_dir_all(dir);
    }
}
