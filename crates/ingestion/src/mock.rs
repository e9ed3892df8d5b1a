//! In-memory bus for tests and offline runs
//!
//! Cloning a `MockBus` shares its state, so a test can keep one handle to
//! publish payloads while the worker owns the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use contracts::{BusClient, BusStats, ContractError, PayloadCallback};
use tracing::debug;

#[derive(Default)]
struct MockState {
    subscription: Option<(String, PayloadCallback)>,
    connected: bool,
    stopped: bool,
}

#[derive(Default)]
struct MockShared {
    state: Mutex<MockState>,
    connect_failure: Option<String>,
    connects: AtomicU64,
    subscribes: AtomicU64,
    delivered: AtomicU64,
    delivered_bytes: AtomicU64,
}

/// Bus client that delivers payloads published through [`MockBus::publish`]
#[derive(Clone, Default)]
pub struct MockBus {
    shared: Arc<MockShared>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus whose `connect` always fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(MockShared {
                connect_failure: Some(message.into()),
                ..Default::default()
            }),
        }
    }

    /// Deliver a payload to the subscriber
    ///
    /// Returns false when nothing is subscribed or the bus was stopped.
    pub fn publish(&self, payload: impl Into<Bytes>) -> bool {
        let callback = {
            let state = self.state();
            match (&state.subscription, state.stopped) {
                (Some((_, callback)), false) => Arc::clone(callback),
                _ => return false,
            }
        };

        let payload = payload.into();
        self.shared.delivered.fetch_add(1, Ordering::Relaxed);
        self.shared
            .delivered_bytes
            .fetch_add(payload.len() as u64, Ordering::Relaxed);
        callback(payload);
        true
    }

    /// Number of successful `connect` calls
    pub fn connect_count(&self) -> u64 {
        self.shared.connects.load(Ordering::Relaxed)
    }

    /// Number of `subscribe` calls
    pub fn subscribe_count(&self) -> u64 {
        self.shared.subscribes.load(Ordering::Relaxed)
    }

    pub fn subscribed_subject(&self) -> Option<String> {
        self.state()
            .subscription
            .as_ref()
            .map(|(subject, _)| subject.clone())
    }

    pub fn is_stopped(&self) -> bool {
        self.state().stopped
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl BusClient for MockBus {
    fn endpoint(&self) -> &str {
        "mock://"
    }

    async fn connect(&mut self) -> Result<(), ContractError> {
        if let Some(message) = &self.shared.connect_failure {
            return Err(ContractError::bus_connection(self.endpoint(), message.clone()));
        }
        self.shared.connects.fetch_add(1, Ordering::Relaxed);
        self.state().connected = true;
        Ok(())
    }

    async fn subscribe(
        &mut self,
        subject: &str,
        callback: PayloadCallback,
    ) -> Result<(), ContractError> {
        let mut state = self.state();
        if !state.connected {
            return Err(ContractError::BusSubscribe {
                subject: subject.to_string(),
                message: "not connected".to_string(),
            });
        }
        self.shared.subscribes.fetch_add(1, Ordering::Relaxed);
        state.subscription = Some((subject.to_string(), callback));
        debug!(subject, "mock subscription registered");
        Ok(())
    }

    fn stats(&self) -> BusStats {
        if !self.state().connected {
            return BusStats::default();
        }
        BusStats {
            in_msgs: self.shared.delivered.load(Ordering::Relaxed),
            in_bytes: self.shared.delivered_bytes.load(Ordering::Relaxed),
            ..Default::default()
        }
    }

    async fn stop(&mut self) {
        let mut state = self.state();
        state.stopped = true;
        state.subscription = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_requires_subscription() {
        let mut bus = MockBus::new();
        assert!(!bus.publish("[]"));

        bus.connect().await.unwrap();
        let seen = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&seen);
        bus.subscribe(
            "dnstap",
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        )
        .await
        .unwrap();

        assert!(bus.publish("[]"));
        assert_eq!(seen.load(Ordering::Relaxed), 1);
        assert_eq!(bus.stats().in_bytes, 2);
    }

    #[tokio::test]
    async fn test_subscribe_before_connect_fails() {
        let mut bus = MockBus::new();
        let result = bus.subscribe("dnstap", Arc::new(|_| {})).await;
        assert!(matches!(result, Err(ContractError::BusSubscribe { .. })));
    }
}
