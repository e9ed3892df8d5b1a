//! `validate` command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use contracts::{ActivationWindow, OutputFormat, RelayConfig, DEFAULT_TEMPLATE, DISCARD_FILENAME};
use dispatcher::Formatter;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Debug, Serialize)]
struct ConfigSummary {
    output: String,
    sink: String,
    nats_host: String,
    subject: String,
    auth: &'static str,
    queue_size: usize,
    start: String,
    end: String,
}

/// Execute the `validate` command on an already loaded configuration
pub fn run_validate(args: &ValidateArgs, loaded: Result<RelayConfig>) -> Result<()> {
    let config_path = args.config.config.as_ref().map(|p| p.display().to_string());
    info!(config = ?config_path, "Validating configuration");

    let result = match loaded.and_then(|config| check(&config).map(|s| (config, s))) {
        Ok((config, summary)) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(summary),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("{e:#}")),
            warnings: None,
            summary: None,
        },
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

/// Checks beyond the config loader: the template must compile
fn check(config: &RelayConfig) -> Result<ConfigSummary> {
    Formatter::from_config(&config.output).context("Invalid output settings")?;
    let window = ActivationWindow::parse(config.start.as_deref(), config.end.as_deref(), Utc::now())
        .context("Invalid activation window")?;

    Ok(ConfigSummary {
        output: config.output.format.to_string(),
        sink: sink_description(config),
        nats_host: config.nats.host.clone(),
        subject: config.nats.subject.clone(),
        auth: config.nats.credentials().kind(),
        queue_size: config.queue_capacity(),
        start: window.start().to_rfc3339(),
        end: if window.is_unbounded() {
            "infinite".to_string()
        } else {
            window.end().to_rfc3339()
        },
    })
}

fn sink_description(config: &RelayConfig) -> String {
    let output = &config.output;
    if output.format == OutputFormat::Dns {
        format!("dns forward to {}", output.servers.join(", "))
    } else if output.filename.is_empty() {
        "stdout".to_string()
    } else if output.filename == DISCARD_FILENAME {
        "discard".to_string()
    } else {
        format!("file {}", output.filename)
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &RelayConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let output = &config.output;

    if output.format != OutputFormat::Dns && !output.servers.is_empty() {
        warnings.push(format!("servers are ignored for {} output", output.format));
    }
    if output.format != OutputFormat::Line && output.template != DEFAULT_TEMPLATE {
        warnings.push(format!("template is ignored for {} output", output.format));
    }

    let writes_file = output.format != OutputFormat::Dns
        && !output.filename.is_empty()
        && output.filename != DISCARD_FILENAME;
    if !output.rotate_exec.trim().is_empty() && !writes_file {
        warnings.push("rotate-exec is ignored unless output goes to a file".to_string());
    }
    if writes_file && !output.filename.contains('%') {
        warnings.push("filename has no time pattern, the file will never rotate".to_string());
    }

    if config.dry_run {
        warnings.push("dry-run is set, `run` will exit without subscribing".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    let source = result.config_path.as_deref().unwrap_or("(flags and environment)");
    if result.valid {
        println!("✓ Configuration is valid: {}", source);

        if let Some(ref summary) = result.summary {
            println!("\n  Output: {}", summary.output);
            println!("  Sink: {}", summary.sink);
            println!("  NATS: {} subject={} auth={}", summary.nats_host, summary.subject, summary.auth);
            println!("  Queue size: {}", summary.queue_size);
            println!("  Window: {} .. {}", summary.start, summary.end);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", source);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
