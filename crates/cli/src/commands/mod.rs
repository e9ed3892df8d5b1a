//! Command implementations.

mod run;
mod validate;

pub use run::run_relay;
pub use validate::run_validate;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::RelayConfig;

use crate::cli::ConfigArgs;

/// Assemble the effective configuration
///
/// Defaults, then the config file if one is given, then command-line and
/// environment overrides. Validation runs on the merged result.
pub fn load_config(args: &ConfigArgs) -> Result<RelayConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            ConfigLoader::read_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => RelayConfig::default(),
    };

    args.apply(&mut config);
    ConfigLoader::validate(&config).context("Invalid configuration")?;
    Ok(config)
}
