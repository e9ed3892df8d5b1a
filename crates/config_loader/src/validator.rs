//! Configuration validation module
//!
//! Validation rules:
//! - bus host and subject are set
//! - `dns` output has at least one destination
//! - filename is a valid strftime template
//! - start/end are RFC 3339 and start <= end
//! - stats_interval > 0

use chrono::format::{Item, StrftimeItems};
use chrono::Utc;

use contracts::{ActivationWindow, ContractError, OutputFormat, RelayConfig, DISCARD_FILENAME};

/// Validate RelayConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_nats(config)?;
    validate_output(config)?;
    validate_filename(config)?;
    validate_window(config)?;
    validate_stats_interval(config)?;
    Ok(())
}

/// Validate bus connection settings
fn validate_nats(config: &RelayConfig) -> Result<(), ContractError> {
    if config.nats.host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "nats.host",
            "host cannot be empty",
        ));
    }
    if config.nats.subject.trim().is_empty() {
        return Err(ContractError::config_validation(
            "nats.subject",
            "subject cannot be empty",
        ));
    }
    if matches!(config.nats.group.as_deref(), Some(g) if g.trim().is_empty()) {
        return Err(ContractError::config_validation(
            "nats.group",
            "group cannot be empty when set",
        ));
    }
    Ok(())
}

/// Validate output routing
fn validate_output(config: &RelayConfig) -> Result<(), ContractError> {
    let output = &config.output;
    if output.format == OutputFormat::Dns && output.servers.is_empty() {
        return Err(ContractError::config_validation(
            "servers",
            "dns output requires at least one server",
        ));
    }
    if output.format == OutputFormat::Line && output.template.is_empty() {
        return Err(ContractError::config_validation(
            "template",
            "line output requires a template",
        ));
    }
    Ok(())
}

/// Validate the rotating file path template
fn validate_filename(config: &RelayConfig) -> Result<(), ContractError> {
    let filename = &config.output.filename;
    if filename.is_empty() || filename == DISCARD_FILENAME {
        return Ok(());
    }
    if StrftimeItems::new(filename).any(|item| matches!(item, Item::Error)) {
        return Err(ContractError::config_validation(
            "filename",
            format!("invalid strftime pattern `{filename}`"),
        ));
    }
    Ok(())
}

/// Validate activation window
fn validate_window(config: &RelayConfig) -> Result<(), ContractError> {
    ActivationWindow::parse(config.start.as_deref(), config.end.as_deref(), Utc::now())?;
    Ok(())
}

/// Validate statistics interval
fn validate_stats_interval(config: &RelayConfig) -> Result<(), ContractError> {
    if config.stats_interval == 0 {
        return Err(ContractError::config_validation(
            "stats-interval",
            "stats-interval must be > 0",
        ));
    }
    Ok(())
}
