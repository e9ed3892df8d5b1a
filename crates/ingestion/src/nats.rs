//! NATS bus client
//!
//! Deliveries run on a spawned task that forwards every message payload to
//! the registered callback. Stopping signals the task, which unsubscribes
//! and drains whatever the client already received before exiting.

use std::sync::atomic::Ordering;
use std::time::Duration;

use async_nats::{Client, ConnectOptions, Subscriber};
use contracts::{BusClient, BusCredentials, BusStats, ContractError, NatsConfig, PayloadCallback};
use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const CLIENT_NAME: &str = "taprelay";
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// [`BusClient`] over an async-nats connection
pub struct NatsBus {
    host: String,
    group: Option<String>,
    credentials: BusCredentials,
    client: Option<Client>,
    delivery: Option<Delivery>,
}

struct Delivery {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl NatsBus {
    pub fn new(config: &NatsConfig) -> Self {
        Self {
            host: config.host.clone(),
            group: config.group.clone().filter(|g| !g.is_empty()),
            credentials: config.credentials(),
            client: None,
            delivery: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn options(&self) -> ConnectOptions {
        let options = match &self.credentials {
            BusCredentials::Token(token) => ConnectOptions::with_token(token.clone()),
            BusCredentials::UserPassword { user, password } => {
                ConnectOptions::with_user_and_password(user.clone(), password.clone())
            }
            BusCredentials::Anonymous => ConnectOptions::new(),
        };

        options.name(CLIENT_NAME).event_callback(|event| async move {
            match event {
                async_nats::Event::Connected => info!("bus connection established"),
                async_nats::Event::Disconnected => warn!("bus connection lost"),
                other => debug!(event = %other, "bus event"),
            }
        })
    }
}

impl BusClient for NatsBus {
    fn endpoint(&self) -> &str {
        &self.host
    }

    async fn connect(&mut self) -> Result<(), ContractError> {
        let client = self
            .options()
            .connect(self.host.as_str())
            .await
            .map_err(|e| ContractError::bus_connection(&self.host, e.to_string()))?;

        info!(
            endpoint = %self.host,
            auth = self.credentials.kind(),
            "connected to bus"
        );
        self.client = Some(client);
        Ok(())
    }

    async fn subscribe(
        &mut self,
        subject: &str,
        callback: PayloadCallback,
    ) -> Result<(), ContractError> {
        let subscribe_err = |message: String| ContractError::BusSubscribe {
            subject: subject.to_string(),
            message,
        };

        let client = self
            .client
            .as_ref()
            .ok_or_else(|| subscribe_err("not connected".to_string()))?;
        if self.delivery.is_some() {
            return Err(subscribe_err("already subscribed".to_string()));
        }

        let subscriber = match &self.group {
            Some(group) => client
                .queue_subscribe(subject.to_string(), group.clone())
                .await
                .map_err(|e| subscribe_err(e.to_string()))?,
            None => client
                .subscribe(subject.to_string())
                .await
                .map_err(|e| subscribe_err(e.to_string()))?,
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(deliver(subscriber, callback, stop_rx));
        self.delivery = Some(Delivery { stop_tx, task });

        info!(subject, group = ?self.group, "subscribed");
        Ok(())
    }

    fn stats(&self) -> BusStats {
        let Some(client) = &self.client else {
            return BusStats::default();
        };
        let stats = client.statistics();
        BusStats {
            in_msgs: stats.in_messages.load(Ordering::Relaxed),
            out_msgs: stats.out_messages.load(Ordering::Relaxed),
            in_bytes: stats.in_bytes.load(Ordering::Relaxed),
            out_bytes: stats.out_bytes.load(Ordering::Relaxed),
            reconnects: stats.connects.load(Ordering::Relaxed).saturating_sub(1),
        }
    }

    async fn stop(&mut self) {
        if let Some(Delivery { stop_tx, task }) = self.delivery.take() {
            let _ = stop_tx.send(());
            if let Err(e) = task.await {
                warn!(error = %e, "delivery task failed");
            }
        }

        if let Some(client) = &self.client {
            if let Err(e) = client.flush().await {
                debug!(error = %e, "flush on stop failed");
            }
        }
    }
}

async fn deliver(
    mut subscriber: Subscriber,
    callback: PayloadCallback,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            message = subscriber.next() => match message {
                Some(message) => callback(message.payload),
                None => {
                    warn!("subscription closed by the bus");
                    return;
                }
            },
        }
    }

    if let Err(e) = subscriber.unsubscribe().await {
        warn!(error = %e, "unsubscribe failed");
        return;
    }

    let mut drained = 0u64;
    while let Ok(Some(message)) = tokio::time::timeout(DRAIN_TIMEOUT, subscriber.next()).await {
        callback(message.payload);
        drained += 1;
    }
    debug!(drained, "subscription drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn config() -> NatsConfig {
        NatsConfig {
            host: "nats://127.0.0.1:1".to_string(),
            group: Some(String::new()),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_group_is_plain_subscription() {
        let bus = NatsBus::new(&config());
        assert!(bus.group.is_none());
        assert_eq!(bus.endpoint(), "nats://127.0.0.1:1");
        assert_eq!(bus.credentials, BusCredentials::Anonymous);
    }

    #[test]
    fn test_stats_zero_before_connect() {
        let bus = NatsBus::new(&config());
        assert!(!bus.is_connected());
        assert_eq!(bus.stats(), BusStats::default());
    }

    #[tokio::test]
    async fn test_subscribe_requires_connection() {
        let mut bus = NatsBus::new(&config());
        let result = bus.subscribe("dnstap", Arc::new(|_| {})).await;
        assert!(matches!(result, Err(ContractError::BusSubscribe { .. })));
    }

    #[tokio::test]
    async fn test_stop_without_connection_is_noop() {
        let mut bus = NatsBus::new(&config());
        bus.stop().await;
        assert!(!bus.is_connected());
    }
}
