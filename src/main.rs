use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use crypto_etl::core::clock::SystemClock;
use crypto_etl::core::config::AppConfig;
use crypto_etl::core::log::init_logging;
use std::sync::Arc;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration and sample exchange rates
    Setup,
    /// Fetch prices, convert them and store the snapshot
    Run,
    /// Display the stored snapshot
    Show {
        /// Column to chart (defaults to the first price_in_* column)
        #[arg(long)]
        column: Option<String>,

        /// Also print the ETL log
        #[arg(long)]
        logs: bool,
    },
    /// Print the ETL log
    Logs,
}

impl From<Commands> for crypto_etl::AppCommand {
    fn from(cmd: Commands) -> crypto_etl::AppCommand {
        match cmd {
            Commands::Run => crypto_etl::AppCommand::Run,
            Commands::Show { column, logs } => crypto_etl::AppCommand::Show { column, logs },
            Commands::Logs => crypto_etl::AppCommand::Logs,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Setup) => {
            init_logging(cli.verbose, None, Arc::new(SystemClock::new(chrono_tz::Etc::UTC)))?;
            crypto_etl::cli::setup::setup()
        }
        Some(cmd) => {
            let config = AppConfig::load_or_default(cli.config_path.as_deref())?;
            let clock = Arc::new(SystemClock::new(config.tz()?));
            init_logging(cli.verbose, Some(&config.paths.log_file), clock)?;
            crypto_etl::run_command(cmd.into(), &config).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
