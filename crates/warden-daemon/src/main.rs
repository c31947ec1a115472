mod cli;

use clap::Parser;
use cli::{
    default_data_dir, handle_config, init_logging, run_checks, run_daemon,
    show_status, show_version, stop_daemon, Cli, Commands,
};
use warden_daemon::{LoggingConfig, WardenConfig, DEFAULT_CONFIG_FILE, DEFAULT_PID_FILE};
use warden_types::WardenResult;

#[tokio::main]
async fn main() -> WardenResult<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir.join(DEFAULT_CONFIG_FILE));

    // Configuration errors surface from the command itself; logging falls
    // back to defaults.
    let logging = WardenConfig::load(&config_path)
        .map(|config| config.logging)
        .unwrap_or_else(|_| LoggingConfig::default());
    init_logging(&cli, &logging)?;

    match cli.command {
        Commands::Run { pid_file } => {
            run_daemon(&config_path, &data_dir, pid_file).await?;
        }
        Commands::Status => {
            let config = WardenConfig::load(&config_path)?;
            show_status(&config, &data_dir.join(DEFAULT_PID_FILE), &cli.format).await?;
        }
        Commands::Check => {
            run_checks(&config_path).await?;
        }
        Commands::Config { action } => {
            handle_config(&config_path, action)?;
        }
        Commands::Stop { force } => {
            stop_daemon(&data_dir.join(DEFAULT_PID_FILE), force).await?;
        }
        Commands::Version => {
            show_version();
        }
    }

    Ok(())
}
