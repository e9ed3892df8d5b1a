//! Ingestion worker - owns the bus subscription and feeds the drop buffer

use std::sync::Arc;

use bytes::Bytes;
use contracts::{BusClient, BusStats, Counter, PayloadCallback};
use tracing::{debug, info, instrument, warn};

use crate::buffer::DropBuffer;
use crate::error::{IngestionError, Result};

/// Worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, nothing opened yet
    Idle,
    /// Connected, not subscribed
    Connected,
    /// Subscribed, payloads flow into the buffer
    Running,
    /// Unsubscribed and drained
    Stopped,
}

/// Ingestion Worker
///
/// Registers a delivery callback that counts every payload and writes it
/// into the [`DropBuffer`]. The callback never blocks the bus client.
pub struct IngestionWorker<C: BusClient> {
    client: C,
    subject: String,
    buffer: Arc<DropBuffer>,
    received: Arc<Counter>,
    state: WorkerState,
}

impl<C: BusClient> IngestionWorker<C> {
    /// Create new worker
    ///
    /// # Arguments
    /// * `client` - Bus client, not yet connected
    /// * `subject` - Subject to subscribe to
    /// * `buffer` - Destination of received payloads
    /// * `received` - Incremented once per delivered payload
    pub fn new(
        client: C,
        subject: impl Into<String>,
        buffer: Arc<DropBuffer>,
        received: Arc<Counter>,
    ) -> Self {
        Self {
            client,
            subject: subject.into(),
            buffer,
            received,
            state: WorkerState::Idle,
        }
    }

    /// Connect and subscribe
    ///
    /// A connection failure is returned to the caller; there is no retry at
    /// this layer.
    #[instrument(
        name = "ingestion_worker_run",
        skip(self),
        fields(subject = %self.subject, endpoint = %self.client.endpoint())
    )]
    pub async fn run(&mut self) -> Result<()> {
        match self.state {
            WorkerState::Idle => {}
            WorkerState::Stopped => {
                return Err(IngestionError::Stopped {
                    subject: self.subject.clone(),
                })
            }
            WorkerState::Connected | WorkerState::Running => {
                return Err(IngestionError::AlreadyRunning {
                    subject: self.subject.clone(),
                })
            }
        }

        self.client.connect().await?;
        self.state = WorkerState::Connected;
        debug!("bus connected");

        let callback = self.delivery_callback();
        self.client.subscribe(&self.subject, callback).await?;
        self.state = WorkerState::Running;

        info!(
            subject = %self.subject,
            endpoint = %self.client.endpoint(),
            capacity = self.buffer.capacity(),
            "ingestion worker running"
        );
        Ok(())
    }

    fn delivery_callback(&self) -> PayloadCallback {
        let buffer = Arc::clone(&self.buffer);
        let received = Arc::clone(&self.received);
        Arc::new(move |payload: Bytes| {
            received.inc();
            buffer.write(payload);
        })
    }

    /// Unsubscribe, drain and close the buffer for writing
    ///
    /// No further payloads reach the buffer after this returns.
    #[instrument(name = "ingestion_worker_stop", skip(self), fields(subject = %self.subject))]
    pub async fn stop(&mut self) {
        match self.state {
            WorkerState::Connected | WorkerState::Running => {
                self.client.stop().await;
                info!(subject = %self.subject, "ingestion worker stopped");
            }
            WorkerState::Idle => {
                debug!("stop called before run");
            }
            WorkerState::Stopped => {
                warn!("stop called twice");
                return;
            }
        }
        self.buffer.close();
        self.state = WorkerState::Stopped;
    }

    /// Bus-level statistics, zero when not connected
    pub fn stats(&self) -> BusStats {
        self.client.stats()
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn buffer(&self) -> &Arc<DropBuffer> {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;

    fn worker(bus: MockBus, capacity: usize) -> (IngestionWorker<MockBus>, Arc<Counter>) {
        let received = Arc::new(Counter::new());
        let buffer = Arc::new(DropBuffer::new(capacity, Arc::new(Counter::new())));
        (
            IngestionWorker::new(bus, "dnstap", buffer, Arc::clone(&received)),
            received,
        )
    }

    #[tokio::test]
    async fn test_worker_lifecycle() {
        let bus = MockBus::new();
        let (mut worker, received) = worker(bus.clone(), 4);
        assert_eq!(worker.state(), WorkerState::Idle);
        assert_eq!(worker.stats(), BusStats::default());

        worker.run().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Running);
        assert_eq!(bus.subscribe_count(), 1);
        assert_eq!(bus.subscribed_subject().as_deref(), Some("dnstap"));

        assert!(bus.publish("[]"));
        assert!(bus.publish("[{}]"));
        assert_eq!(received.get(), 2);
        assert_eq!(worker.buffer().len(), 2);
        assert_eq!(worker.stats().in_msgs, 2);

        worker.stop().await;
        assert_eq!(worker.state(), WorkerState::Stopped);
        assert!(!bus.publish("[]"));
        assert_eq!(received.get(), 2);
        assert!(worker.buffer().is_closed());
    }

    #[tokio::test]
    async fn test_connect_failure_is_surfaced() {
        let bus = MockBus::failing("connection refused");
        let (mut worker, _) = worker(bus.clone(), 4);

        let err = worker.run().await.unwrap_err();
        assert!(err.to_string().contains("connection refused"), "got: {err}");
        assert_eq!(worker.state(), WorkerState::Idle);
        assert_eq!(bus.subscribe_count(), 0);
    }

    #[tokio::test]
    async fn test_run_twice_rejected() {
        let bus = MockBus::new();
        let (mut worker, _) = worker(bus, 4);
        worker.run().await.unwrap();
        assert!(matches!(
            worker.run().await,
            Err(IngestionError::AlreadyRunning { .. })
        ));
    }

    #[tokio::test]
    async fn test_overflow_through_callback() {
        let bus = MockBus::new();
        let (mut worker, received) = worker(bus.clone(), 2);
        worker.run().await.unwrap();

        for _ in 0..5 {
            bus.publish("[]");
        }
        assert_eq!(received.get(), 5);
        assert_eq!(worker.buffer().len(), 2);
        assert_eq!(worker.buffer().lost(), 3);
    }
}
