//! Monotonic 64-bit counter with wraparound-aware deltas

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe monotonically increasing counter
///
/// Increments wrap at `u64::MAX`; use [`diff`] to compare two observations.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one
    #[inline]
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Recent value, not a linearizable snapshot
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Increments between two observations of a counter
    #[inline]
    pub fn diff(prev: u64, cur: u64) -> u64 {
        diff(prev, cur)
    }
}

/// Increments between `prev` and `cur`, allowing for one wraparound
#[inline]
pub fn diff(prev: u64, cur: u64) -> u64 {
    if prev <= cur {
        cur - prev
    } else {
        u64::MAX - prev + cur
    }
}
