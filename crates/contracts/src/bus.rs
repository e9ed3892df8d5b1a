//! BusClient trait - message bus subscription abstraction
//!
//! Decouples the ingestion worker from the concrete bus client so the relay can
//! run against a real NATS server or an in-memory bus.

use std::sync::Arc;

use bytes::Bytes;

use crate::{BusStats, ContractError};

/// Delivery callback type
///
/// Invoked on the bus client's own delivery task for every received payload.
/// Must not block.
pub type PayloadCallback = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Message bus client trait
///
/// # Example
///
/// ```ignore
/// let mut client: impl BusClient = get_client();
/// client.connect().await?;
/// client.subscribe("dnstap", Arc::new(|payload| buffer.write(payload))).await?;
/// // ... use subscription ...
/// client.stop().await;
/// ```
#[trait_variant::make(BusClient: Send)]
pub trait LocalBusClient {
    /// Endpoint description (used for logging)
    fn endpoint(&self) -> &str;

    /// Establish the connection
    ///
    /// # Errors
    /// Connection failure is returned as-is, no retry at this layer.
    async fn connect(&mut self) -> Result<(), ContractError>;

    /// Register `callback` for every payload published on `subject`
    async fn subscribe(
        &mut self,
        subject: &str,
        callback: PayloadCallback,
    ) -> Result<(), ContractError>;

    /// Connection statistics, zero when not connected
    fn stats(&self) -> BusStats;

    /// Unsubscribe and drain
    ///
    /// No callback invocation happens after this returns.
    async fn stop(&mut self);
}
