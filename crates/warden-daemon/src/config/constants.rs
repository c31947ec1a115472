pub use warden_types::{DEFAULT_API_PORT, DEFAULT_PROCESS_ID};

pub const DEFAULT_CONFIG_FILE: &str = "warden.toml";
pub const DEFAULT_EVENT_LOG: &str = "logs/warden.log";
pub const DEFAULT_PID_FILE: &str = "warden.pid";
pub const DEFAULT_ECOSYSTEM_FILE: &str = "ecosystem.config.js";
pub const DEFAULT_CONNECTIVITY_HOSTS: [&str; 2] = ["8.8.8.8:53", "1.1.1.1:53"];
