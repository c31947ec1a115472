use super::commands::Cli;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};
use warden_daemon::LoggingConfig;
use warden_types::{WardenError, WardenResult};

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn init_logging(cli: &Cli, logging: &LoggingConfig) -> WardenResult<()> {
    let base = logging.level.to_string();
    let level = if cli.quiet {
        "warn".to_string()
    } else {
        match cli.verbose {
            0 => base,
            1 => format!("{},warden_daemon=debug", base),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_file = cli.log_file.clone().or_else(|| logging.file.clone());
    let output: Box<dyn Layer<Registry> + Send + Sync> = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| WardenError::Config(format!("Failed to open log file {:?}: {}", path, e)))?;
            let writer = std::sync::Mutex::new(file);
            if logging.json {
                fmt::layer().json().with_writer(writer).boxed()
            } else {
                fmt::layer().with_writer(writer).with_ansi(false).boxed()
            }
        }
        None if logging.json => fmt::layer().json().boxed(),
        None => fmt::layer().with_target(cli.verbose >= 2).boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(env_filter)
        .try_init()
        .map_err(|e| WardenError::Internal(format!("Failed to initialize logging: {}", e)))
}

pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".warden"))
        .unwrap_or_else(|| PathBuf::from(".warden"))
}

/// Relative paths are taken relative to the data directory.
pub fn resolve_path(data_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

pub fn print_banner() {
    println!();
    println!("\x1b[38;5;46m  warden\x1b[0m \x1b[38;5;245mv{}\x1b[0m", BUILD_VERSION);
    println!("\x1b[38;5;245m  keep-alive supervisor\x1b[0m");
    println!();
}

pub fn format_uptime(secs: u64) -> String {
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
