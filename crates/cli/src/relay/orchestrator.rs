//! Relay orchestrator - the activation window and dispatch loop.
//!
//! Lifecycle: `Sleeping -> Active -> Draining -> Terminated`. The loop is
//! single-threaded; each iteration handles exactly one of deadline, shutdown,
//! statistics tick or buffered payload.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use contracts::{
    ActivationWindow, BusClient, Counter, RecordSink, RelayConfig, RelayCounts, TelemetryRecord,
};
use dispatcher::{create_sink, Formatter};
use ingestion::{DropBuffer, IngestionWorker};
use observability::{record_skipped, SkipStage};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{IntervalReporter, RelayStats};

/// Relay lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Waiting for the start time
    Sleeping,
    /// Subscribed and dispatching
    Active,
    /// Worker stopped, buffered payloads dispatched, sink closing
    Draining,
    Terminated,
}

/// Main relay orchestrator
pub struct Relay<C: BusClient> {
    config: RelayConfig,
    window: ActivationWindow,
    client: C,
    state: watch::Sender<RelayState>,
}

impl<C: BusClient> Relay<C> {
    /// Create a relay over `client`; nothing is opened until it runs
    pub fn new(config: RelayConfig, window: ActivationWindow, client: C) -> Self {
        let (state, _) = watch::channel(RelayState::Sleeping);
        Self {
            config,
            window,
            client,
            state,
        }
    }

    /// Observe lifecycle transitions
    pub fn state(&self) -> watch::Receiver<RelayState> {
        self.state.subscribe()
    }

    /// Run with the sink selected by configuration until the end time or
    /// until `shutdown` resolves
    ///
    /// # Errors
    /// Startup failures: template compilation, sink creation, bus connection.
    pub async fn run_until<F>(self, shutdown: F) -> Result<RelayStats>
    where
        F: Future<Output = ()>,
    {
        self.log_window();
        let formatter =
            Formatter::from_config(&self.config.output).context("Failed to build formatter")?;
        let sink = create_sink(&self.config.output).context("Failed to create output sink")?;
        self.drive(formatter, sink, shutdown).await
    }

    /// Like [`Relay::run_until`] with a caller-provided sink
    pub async fn run_with_sink<S, F>(self, sink: S, shutdown: F) -> Result<RelayStats>
    where
        S: RecordSink,
        F: Future<Output = ()>,
    {
        self.log_window();
        let formatter =
            Formatter::from_config(&self.config.output).context("Failed to build formatter")?;
        self.drive(formatter, sink, shutdown).await
    }

    fn log_window(&self) {
        let end = if self.window.is_unbounded() {
            "infinite".to_string()
        } else {
            self.window.end().to_rfc3339()
        };
        info!(start = %self.window.start().to_rfc3339(), end = %end, "Activation window");
    }

    async fn drive<S, F>(self, formatter: Formatter, mut sink: S, shutdown: F) -> Result<RelayStats>
    where
        S: RecordSink,
        F: Future<Output = ()>,
    {
        let Self {
            config,
            window,
            client,
            state,
        } = self;

        let lost = Arc::new(Counter::new());
        let received = Arc::new(Counter::new());
        let dispatched = Counter::new();
        let buffer = Arc::new(DropBuffer::new(config.queue_capacity(), Arc::clone(&lost)));
        let mut worker = IngestionWorker::new(
            client,
            config.nats.subject.clone(),
            Arc::clone(&buffer),
            Arc::clone(&received),
        );
        let mut stats = RelayStats::default();

        if config.dry_run {
            info!(sink = sink.name(), "Dry run mode - configuration is valid, exiting");
            close_sink(&mut sink).await;
            state.send_replace(RelayState::Terminated);
            return Ok(stats);
        }

        tokio::pin!(shutdown);

        if let Some(wait) = window.until_start(Utc::now()) {
            info!(wait_secs = wait.as_secs(), "Sleeping until start time");
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = &mut shutdown => {
                    info!("Received shutdown signal before start time");
                    close_sink(&mut sink).await;
                    state.send_replace(RelayState::Terminated);
                    return Ok(stats);
                }
            }
        }

        if !window.contains(Utc::now()) {
            info!(end = %window.end().to_rfc3339(), "Activation window already closed");
            close_sink(&mut sink).await;
            state.send_replace(RelayState::Terminated);
            return Ok(stats);
        }

        if let Err(e) = worker.run().await {
            close_sink(&mut sink).await;
            state.send_replace(RelayState::Terminated);
            return Err(e).context("Failed to start ingestion worker");
        }
        stats.activations += 1;
        state.send_replace(RelayState::Active);
        info!(
            subject = %config.nats.subject,
            sink = sink.name(),
            queue_size = buffer.capacity(),
            "Relay active"
        );

        let active_since = Instant::now();
        let deadline = wait_deadline(window.until_end(Utc::now()));
        tokio::pin!(deadline);

        let period = Duration::from_secs(config.stats_interval.max(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut reporter = IntervalReporter::new();
        let counts = || RelayCounts {
            received: received.get(),
            dispatched: dispatched.get(),
            lost: lost.get(),
        };

        loop {
            tokio::select! {
                biased;

                _ = &mut deadline => {
                    info!("End time reached");
                    break;
                }
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    reporter.report(buffer.len(), counts(), worker.stats());
                }
                payload = buffer.read() => match payload {
                    Some(payload) => {
                        dispatch(&formatter, &mut sink, &dispatched, &mut stats, &payload).await;
                    }
                    None => {
                        warn!("Buffer closed while active");
                        break;
                    }
                },
            }
        }

        state.send_replace(RelayState::Draining);
        info!("Draining relay");
        worker.stop().await;

        // The buffer is closed for writing; dispatch what it still holds
        let mut drained = 0u64;
        while let Some(payload) = buffer.try_read() {
            dispatch(&formatter, &mut sink, &dispatched, &mut stats, &payload).await;
            drained += 1;
        }
        if drained > 0 {
            info!(payloads = drained, "Dispatched buffered payloads");
        }
        close_sink(&mut sink).await;

        stats.received = received.get();
        stats.lost = lost.get();
        stats.dispatched = dispatched.get();
        stats.duration = active_since.elapsed();
        stats.rates = reporter.rates();

        state.send_replace(RelayState::Terminated);
        info!(
            records_out = stats.dispatched,
            duration_secs = stats.duration.as_secs_f64(),
            "Relay terminated"
        );
        Ok(stats)
    }
}

/// Decode one batch payload and push every record through formatter and sink
///
/// Nothing here is fatal: a bad payload or record is logged and skipped.
async fn dispatch<S: RecordSink>(
    formatter: &Formatter,
    sink: &mut S,
    dispatched: &Counter,
    stats: &mut RelayStats,
    payload: &[u8],
) {
    let records = match TelemetryRecord::decode_batch(payload) {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, bytes = payload.len(), "Failed to parse batch payload");
            stats.decode_failures += 1;
            record_skipped(SkipStage::Decode);
            return;
        }
    };

    for record in &records {
        dispatched.inc();

        let bytes = match formatter.format(record) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, qname = %record.qname, "Failed to format record");
                stats.format_failures += 1;
                record_skipped(SkipStage::Format);
                continue;
            }
        };

        if let Err(e) = sink.write(&bytes).await {
            warn!(error = %e, sink = sink.name(), "Failed to write record");
            stats.write_failures += 1;
            record_skipped(SkipStage::Write);
        }
    }
    debug!(records = records.len(), "Batch dispatched");
}

/// Resolves at the deadline, never when there is none
async fn wait_deadline(remaining: Option<Duration>) {
    match remaining.and_then(|d| Instant::now().checked_add(d)) {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn close_sink<S: RecordSink>(sink: &mut S) {
    if let Err(e) = sink.close().await {
        warn!(error = %e, sink = sink.name(), "Failed to close sink");
    }
}
