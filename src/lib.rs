pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::debug;

pub enum AppCommand {
    Run,
    Show {
        column: Option<String>,
        logs: bool,
    },
    Logs,
}

pub async fn run_command(command: AppCommand, config: &AppConfig) -> Result<()> {
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Run => cli::run::run(config).await,
        AppCommand::Show { column, logs } => cli::dashboard::run(config, column.as_deref(), logs),
        AppCommand::Logs => cli::logs::run(&config.paths.log_file),
    }
}
