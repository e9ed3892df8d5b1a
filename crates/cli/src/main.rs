//! # taprelay
//!
//! Command-line entry point.
//!
//! Loads the configuration, sets up logging and runs the relay or the
//! configuration check.

mod cli;
mod commands;
mod relay;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{load_config, run_relay, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // The log level comes from the configuration; a broken one still gets
    // default logging so the error below is visible
    let loaded = load_config(cli.command.config_args());
    let log_level = loaded.as_ref().map(|c| c.loglevel).unwrap_or_default();
    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        log_level,
        metrics_port: None,
    })?;

    info!(version = env!("CARGO_PKG_VERSION"), "taprelay starting");

    let result = match &cli.command {
        Commands::Validate(args) => run_validate(args, loaded),
        Commands::Run(args) => match loaded {
            Ok(config) => run_relay(args, config).await,
            Err(e) => Err(e),
        },
    };

    if let Err(ref e) = result {
        error!(error = %format!("{e:#}"), "Command failed");
    }

    result
}
