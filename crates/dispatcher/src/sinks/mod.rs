//! Sink implementations
//!
//! Contains StdoutSink, RotatingFileSink, DnsForwardSink, and DiscardSink.

mod discard;
mod dns;
mod file;
mod stdout;

pub use self::discard::DiscardSink;
pub use self::dns::{Destination, DnsForwardSink, Transport, DNS_PORT, SEND_TIMEOUT};
pub use self::file::{RotatingFileSink, WRITE_BUFFER_SIZE};
pub use self::stdout::StdoutSink;
