//! # Observability
//!
//! Tracing and Prometheus metrics for the relay.
//!
//! ## Features
//!
//! - Tracing initialization (Pretty/Compact/JSON), written to stderr
//! - Prometheus metrics export
//! - Relay interval statistics as metrics
//!
//! ## Usage Example
//!
//! ```ignore
//! use observability::{ObservabilityConfig, LogFormat};
//!
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     log_level: config.loglevel,
//!     metrics_port: None,
//! })?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use contracts::LogLevel;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{record_interval, record_skipped, RateSummary, RateTracker, SkipStage};

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log format
    pub log_format: LogFormat,
    /// Level used when `RUST_LOG` is unset
    pub log_level: LogLevel,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: LogLevel::Info,
            metrics_port: None,
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable
    #[default]
    Pretty,
    /// Single line per event
    Compact,
}

/// Filter from `RUST_LOG`, falling back to `level`
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()))
}

/// Initialize tracing and, if a port is given, the Prometheus exporter
///
/// Log output goes to stderr; stdout carries relay output.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(config.log_level))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        log_level = config.log_level.as_filter(),
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Install only the Prometheus recorder and its HTTP listener
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.log_level, LogLevel::Info);
    }
}
