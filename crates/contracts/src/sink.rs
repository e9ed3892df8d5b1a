//! RecordSink trait - Output Sink interface
//!
//! Defines the abstract interface for output destinations.

use crate::ContractError;

/// Formatted record output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(RecordSink: Send)]
pub trait LocalRecordSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one formatted record
    ///
    /// Returns the number of bytes handed to the destination.
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, payload: &[u8]) -> Result<usize, ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
