//! Relay orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Relay, RelayState};
pub use stats::{IntervalReporter, RelayStats};
