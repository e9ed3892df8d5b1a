//! # Ingestion
//!
//! Bus-side half of the relay.
//!
//! Responsibilities:
//! - Connect to the message bus and subscribe to the configured subject
//! - Count every delivered batch payload
//! - Store payloads in a bounded drop buffer that never blocks the bus
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ingestion::{Counter, DropBuffer, IngestionWorker, NatsBus};
//!
//! let buffer = Arc::new(DropBuffer::new(10_000, Arc::new(Counter::new())));
//! let mut worker = IngestionWorker::new(
//!     NatsBus::new(&config.nats),
//!     &config.nats.subject,
//!     Arc::clone(&buffer),
//!     Arc::new(Counter::new()),
//! );
//! worker.run().await?;
//! while let Some(payload) = buffer.read().await {
//!     // Decode and dispatch
//! }
//! ```

mod buffer;
mod error;
mod mock;
mod nats;
mod worker;

pub use buffer::DropBuffer;
pub use contracts::Counter;
pub use error::{IngestionError, Result};
pub use mock::MockBus;
pub use nats::NatsBus;
pub use worker::{IngestionWorker, WorkerState};
