mod checks;
mod commands;
mod config_cmd;
mod info;
mod run;
mod stop;
mod utils;

pub use checks::run_checks;
pub use commands::{Cli, Commands};
pub use config_cmd::handle_config;
pub use info::{show_status, show_version};
pub use run::run_daemon;
pub use stop::stop_daemon;
pub use utils::{default_data_dir, init_logging};
