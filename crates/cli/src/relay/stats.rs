//! Relay statistics: interval reports and the end-of-run summary.

use std::time::{Duration, Instant};

use contracts::{BusStats, RelayCounts};
use observability::{RateSummary, RateTracker};
use tracing::info;

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Payloads delivered by the bus
    pub received: u64,

    /// Payloads lost to buffer overflow
    pub lost: u64,

    /// Records decoded and handed to the formatter
    pub dispatched: u64,

    /// Payloads that were not a JSON array of records
    pub decode_failures: u64,

    /// Records the formatter rejected
    pub format_failures: u64,

    /// Records the sink rejected
    pub write_failures: u64,

    /// Times the relay entered the active state
    pub activations: u64,

    /// Time spent active
    pub duration: Duration,

    /// Per-interval records-per-second
    pub rates: RateSummary,
}

impl RelayStats {
    /// Records dispatched per second while active
    pub fn records_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.dispatched as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received payloads that were lost, in percent
    pub fn loss_rate(&self) -> f64 {
        if self.received > 0 {
            self.lost as f64 / self.received as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        info!(
            payloads_in = self.received,
            payloads_lost = self.lost,
            loss_pct = format!("{:.2}", self.loss_rate()),
            records_out = self.dispatched,
            decode_failures = self.decode_failures,
            format_failures = self.format_failures,
            write_failures = self.write_failures,
            duration_secs = format!("{:.1}", self.duration.as_secs_f64()),
            records_per_sec = format!("{:.2}", self.records_per_sec()),
            interval_rates = %self.rates,
            "Relay summary"
        );
    }
}

/// Emits per-interval deltas of the relay and bus counters
#[derive(Debug)]
pub struct IntervalReporter {
    prev_counts: RelayCounts,
    prev_bus: BusStats,
    last: Instant,
    rates: RateTracker,
}

impl IntervalReporter {
    pub fn new() -> Self {
        Self {
            prev_counts: RelayCounts::default(),
            prev_bus: BusStats::default(),
            last: Instant::now(),
            rates: RateTracker::new(),
        }
    }

    /// Log and record the increments since the previous call
    pub fn report(&mut self, queue_depth: usize, counts: RelayCounts, bus: BusStats) -> (RelayCounts, BusStats) {
        let delta = counts.delta(&self.prev_counts);
        let bus_delta = bus.delta(&self.prev_bus);

        info!(
            queue_depth,
            "in" = delta.received,
            "out" = delta.dispatched,
            lost = delta.lost,
            in_msgs = bus_delta.in_msgs,
            out_msgs = bus_delta.out_msgs,
            in_bytes = bus_delta.in_bytes,
            out_bytes = bus_delta.out_bytes,
            reconnects = bus_delta.reconnects,
            "Relay statistics"
        );
        observability::record_interval(queue_depth, &delta, &bus_delta);

        let now = Instant::now();
        self.rates
            .observe(delta.dispatched, now.duration_since(self.last).as_secs_f64());
        self.last = now;
        self.prev_counts = counts;
        self.prev_bus = bus;

        (delta, bus_delta)
    }

    pub fn rates(&self) -> RateSummary {
        self.rates.summary()
    }
}

impl Default for IntervalReporter {
    fn default() -> Self {
        Self::new()
    }
}
