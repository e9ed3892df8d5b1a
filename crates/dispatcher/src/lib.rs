//! # Dispatcher
//!
//! Output half of the relay.
//!
//! Responsibilities:
//! - Turn a decoded `TelemetryRecord` into bytes (line template, JSON, DNS query)
//! - Write the bytes to the configured sink (stdout, rotating file, DNS
//!   replay, discard)
//! - Run the post-rotation hook

pub mod error;
pub mod format;
pub mod hook;
pub mod output;
pub mod sinks;

pub use contracts::{RecordSink, TelemetryRecord};
pub use error::DispatcherError;
pub use format::{DnsFormatter, Formatter, JsonFormatter, LineFormatter};
pub use hook::RotationHook;
pub use output::{create_sink, OutputSink};
pub use sinks::{DiscardSink, DnsForwardSink, RotatingFileSink, StdoutSink};
