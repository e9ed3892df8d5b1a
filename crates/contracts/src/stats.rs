//! Throughput snapshots shared by the ingestion worker and the relay loop

use serde::Serialize;

use crate::counter::diff;

/// Bus-level connection statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    pub in_msgs: u64,
    pub out_msgs: u64,
    pub in_bytes: u64,
    pub out_bytes: u64,
    pub reconnects: u64,
}

impl BusStats {
    /// Per-field increments since `prev`
    pub fn delta(&self, prev: &BusStats) -> BusStats {
        BusStats {
            in_msgs: diff(prev.in_msgs, self.in_msgs),
            out_msgs: diff(prev.out_msgs, self.out_msgs),
            in_bytes: diff(prev.in_bytes, self.in_bytes),
            out_bytes: diff(prev.out_bytes, self.out_bytes),
            reconnects: diff(prev.reconnects, self.reconnects),
        }
    }
}

/// Relay logical counters: payloads in, records out, payloads lost
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayCounts {
    pub received: u64,
    pub dispatched: u64,
    pub lost: u64,
}

impl RelayCounts {
    /// Per-field increments since `prev`
    pub fn delta(&self, prev: &RelayCounts) -> RelayCounts {
        RelayCounts {
            received: diff(prev.received, self.received),
            dispatched: diff(prev.dispatched, self.dispatched),
            lost: diff(prev.lost, self.lost),
        }
    }
}
