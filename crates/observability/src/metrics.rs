//! Relay metrics
//!
//! Interval deltas are recorded as Prometheus counters, buffer depth as a
//! gauge. [`RateTracker`] keeps the per-interval throughput for the final
//! summary.

use contracts::{BusStats, RelayCounts};
use metrics::{counter, gauge};

/// Where a record or payload was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipStage {
    Decode,
    Format,
    Write,
}

impl SkipStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Format => "format",
            Self::Write => "write",
        }
    }
}

/// Record one statistics interval
///
/// `counts` and `bus` are deltas since the previous interval.
pub fn record_interval(queue_depth: usize, counts: &RelayCounts, bus: &BusStats) {
    gauge!("taprelay_queue_depth").set(queue_depth as f64);

    counter!("taprelay_payloads_received_total").increment(counts.received);
    counter!("taprelay_payloads_lost_total").increment(counts.lost);
    counter!("taprelay_records_dispatched_total").increment(counts.dispatched);

    counter!("taprelay_bus_in_msgs_total").increment(bus.in_msgs);
    counter!("taprelay_bus_out_msgs_total").increment(bus.out_msgs);
    counter!("taprelay_bus_in_bytes_total").increment(bus.in_bytes);
    counter!("taprelay_bus_out_bytes_total").increment(bus.out_bytes);
    counter!("taprelay_bus_reconnects_total").increment(bus.reconnects);
}

/// Count one skipped item
pub fn record_skipped(stage: SkipStage) {
    counter!("taprelay_skipped_total", "stage" => stage.as_str()).increment(1);
}

/// Running min/max/mean of a per-second rate
#[derive(Debug, Clone, Default)]
pub struct RateTracker {
    samples: u64,
    mean: f64,
    min: f64,
    max: f64,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` events observed over `secs` seconds
    pub fn observe(&mut self, count: u64, secs: f64) {
        if secs <= 0.0 {
            return;
        }
        let rate = count as f64 / secs;

        self.samples += 1;
        if self.samples == 1 {
            self.min = rate;
            self.max = rate;
            self.mean = rate;
        } else {
            self.min = self.min.min(rate);
            self.max = self.max.max(rate);
            self.mean += (rate - self.mean) / self.samples as f64;
        }
    }

    pub fn summary(&self) -> RateSummary {
        RateSummary {
            samples: self.samples,
            min: self.min,
            max: self.max,
            mean: self.mean,
        }
    }
}

/// Snapshot of a [`RateTracker`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateSummary {
    pub samples: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl std::fmt::Display for RateSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.samples == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}/s, max={:.1}/s, mean={:.1}/s (n={})",
                self.min, self.max, self.mean, self.samples
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_tracker() {
        let mut rates = RateTracker::new();
        assert_eq!(rates.summary().to_string(), "N/A");

        rates.observe(60, 60.0);
        rates.observe(180, 60.0);
        rates.observe(0, 0.0);

        let summary = rates.summary();
        assert_eq!(summary.samples, 2);
        assert!((summary.min - 1.0).abs() < 1e-9);
        assert!((summary.max - 3.0).abs() < 1e-9);
        assert!((summary.mean - 2.0).abs() < 1e-9);
        assert!(summary.to_string().contains("mean=2.0/s"));
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_interval(3, &RelayCounts::default(), &BusStats::default());
        record_skipped(SkipStage::Decode);
    }
}
