use super::commands::ConfigAction;
use std::path::Path;
use warden_daemon::WardenConfig;
use warden_types::{WardenError, WardenResult};

pub fn handle_config(config_path: &Path, action: Option<ConfigAction>) -> WardenResult<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            if !config_path.exists() {
                println!("\x1b[38;5;245m# No configuration file at {:?}; showing defaults\x1b[0m", config_path);
            }
            let config = WardenConfig::load(config_path)?;
            println!("{}", config.to_toml()?);
        }
        Some(ConfigAction::Init { force }) => {
            if config_path.exists() && !force {
                return Err(WardenError::Config(format!(
                    "{:?} already exists; use --force to overwrite",
                    config_path
                )));
            }
            WardenConfig::default().save(config_path)?;
            println!("\x1b[38;5;46m[+]\x1b[0m Wrote default configuration to {:?}", config_path);
        }
    }
    Ok(())
}
