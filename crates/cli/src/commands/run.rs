//! `run` command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use contracts::{ActivationWindow, RelayConfig};
use ingestion::NatsBus;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::relay::Relay;

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs, config: RelayConfig) -> Result<()> {
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let window = ActivationWindow::parse(config.start.as_deref(), config.end.as_deref(), Utc::now())
        .context("Invalid activation window")?;

    info!(
        output = %config.output.format,
        endpoint = %config.nats.host,
        subject = %config.nats.subject,
        auth = config.nats.credentials().kind(),
        queue_size = config.queue_capacity(),
        dry_run = config.dry_run,
        "Configuration loaded"
    );

    let bus = NatsBus::new(&config.nats);
    let relay = Relay::new(config, window, bus);
    let stats = relay
        .run_until(shutdown_signal())
        .await
        .context("Relay execution failed")?;

    stats.log_summary();
    info!("taprelay finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
