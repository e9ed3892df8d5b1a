//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Activation window bounds are wall-clock instants (UTC)
//! - Rotating file paths are evaluated in local time

mod bus;
mod config;
mod counter;
mod error;
mod record;
mod sink;
mod stats;
mod window;

pub use bus::{BusClient, LocalBusClient, PayloadCallback};
pub use config::*;
pub use counter::{diff, Counter};
pub use error::*;
pub use record::TelemetryRecord;
pub use sink::{LocalRecordSink, RecordSink};
pub use stats::{BusStats, RelayCounts};
pub use window::ActivationWindow;
