//! Broadcast hub actor
//!
//! One task owns the subscriber map. Register/unregister requests and
//! broadcasts arrive over channels, so the map is never touched from two
//! places at once. Within a broadcast, deliveries run concurrently and each
//! is bounded by the send timeout; any subscriber that fails is closed and
//! removed before the next request is handled.

use super::subscriber::Subscriber;
use super::types::{BroadcastMessage, DeliveryError, HubConfig, HubError, SubscriberId};
use crate::ingest::UpdateCallback;
use crate::price::PriceRecord;
use crate::telemetry::{increment, set_gauge, CounterMetric, GaugeMetric};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Control requests; always queued, never dropped
enum Command {
    Register {
        subscriber: Box<dyn Subscriber>,
        ack: oneshot::Sender<bool>,
    },
    Unregister {
        id: SubscriberId,
        ack: oneshot::Sender<bool>,
    },
    LiveSubscribers {
        reply: oneshot::Sender<Vec<SubscriberId>>,
    },
}

/// Cloneable handle for talking to the hub task
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
    broadcasts: mpsc::Sender<BroadcastMessage>,
}

impl HubHandle {
    /// Add a subscriber to the live set
    ///
    /// Returns `false` if a subscriber with the same id is already live, in
    /// which case the new one is dropped.
    pub async fn register(&self, subscriber: Box<dyn Subscriber>) -> Result<bool, HubError> {
        let (ack, rx) = oneshot::channel();
        self.commands
            .send(Command::Register { subscriber, ack })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Remove and close a subscriber; `false` if it was not live
    pub async fn unregister(&self, id: SubscriberId) -> Result<bool, HubError> {
        let (ack, rx) = oneshot::channel();
        self.commands
            .send(Command::Unregister { id, ack })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Queue a message for every live subscriber without waiting
    ///
    /// If the queue is full the message is dropped and `QueueFull` returned.
    pub fn broadcast(&self, message: BroadcastMessage) -> Result<(), HubError> {
        self.broadcasts.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!("Broadcast queue full, dropping update");
                increment(CounterMetric::BroadcastDropped, 1);
                HubError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => HubError::Closed,
        })
    }

    /// Ingestion callback that broadcasts each stored batch as `{"data": [...]}`
    pub fn price_update_callback(&self) -> UpdateCallback {
        let hub = self.clone();
        Arc::new(move |records: &[PriceRecord]| {
            if records.is_empty() {
                return;
            }
            match BroadcastMessage::prices(records) {
                Ok(message) => {
                    if let Err(e) = hub.broadcast(message) {
                        tracing::debug!(error = %e, "Price update not queued");
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to serialize price update"),
            }
        })
    }

    /// Ids of the currently live subscribers
    pub async fn live_subscribers(&self) -> Result<Vec<SubscriberId>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::LiveSubscribers { reply })
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }
}

/// Owner of the live subscriber set
pub struct BroadcastHub {
    config: HubConfig,
    subscribers: HashMap<SubscriberId, Box<dyn Subscriber>>,
    commands: mpsc::Receiver<Command>,
    broadcasts: mpsc::Receiver<BroadcastMessage>,
}

impl BroadcastHub {
    /// Create a hub and its handle without starting it
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(config.queue_capacity.max(1));

        let hub = Self {
            config,
            subscribers: HashMap::new(),
            commands: command_rx,
            broadcasts: broadcast_rx,
        };
        let handle = HubHandle {
            commands: command_tx,
            broadcasts: broadcast_tx,
        };
        (hub, handle)
    }

    /// Create a hub and spawn its loop on the current runtime
    pub fn spawn(config: HubConfig) -> HubHandle {
        let (hub, handle) = Self::new(config);
        tokio::spawn(hub.run());
        handle
    }

    /// Process requests until every handle is dropped
    pub async fn run(mut self) {
        tracing::info!("Broadcast hub started");

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                message = self.broadcasts.recv() => match message {
                    Some(message) => self.deliver_all(&message).await,
                    None => break,
                },
            }
        }

        let ids: Vec<SubscriberId> = self.subscribers.keys().copied().collect();
        for id in ids {
            self.remove(id).await;
        }
        tracing::info!("Broadcast hub stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Register { subscriber, ack } => {
                let id = subscriber.id();
                let added = if self.subscribers.contains_key(&id) {
                    false
                } else {
                    self.subscribers.insert(id, subscriber);
                    tracing::info!(
                        subscriber = %id,
                        live = self.subscribers.len(),
                        "Subscriber registered"
                    );
                    true
                };
                self.publish_live_count();
                let _ = ack.send(added);
            }
            Command::Unregister { id, ack } => {
                let removed = self.remove(id).await;
                let _ = ack.send(removed);
            }
            Command::LiveSubscribers { reply } => {
                let _ = reply.send(self.subscribers.keys().copied().collect());
            }
        }
    }

    async fn deliver_all(&mut self, message: &BroadcastMessage) {
        if self.subscribers.is_empty() {
            return;
        }

        let timeout = self.config.send_timeout;
        let deliveries = self.subscribers.iter_mut().map(|(id, subscriber)| {
            let id = *id;
            async move {
                let result = match tokio::time::timeout(timeout, subscriber.deliver(message)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(DeliveryError::TimedOut(timeout)),
                };
                (id, result)
            }
        });
        let results = join_all(deliveries).await;

        let mut delivered = 0u64;
        let mut failed = Vec::new();
        for (id, result) in results {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        subscriber = %id,
                        error = %e,
                        "Delivery failed, dropping subscriber"
                    );
                    failed.push(id);
                }
            }
        }
        increment(CounterMetric::BroadcastDelivered, delivered);

        for id in failed {
            self.remove(id).await;
        }
    }

    async fn remove(&mut self, id: SubscriberId) -> bool {
        let Some(mut subscriber) = self.subscribers.remove(&id) else {
            return false;
        };

        if tokio::time::timeout(self.config.send_timeout, subscriber.close())
            .await
            .is_err()
        {
            tracing::debug!(subscriber = %id, "Timed out closing subscriber");
        }

        tracing::info!(subscriber = %id, live = self.subscribers.len(), "Subscriber removed");
        increment(CounterMetric::SubscriberRemoved, 1);
        self.publish_live_count();
        true
    }

    fn publish_live_count(&self) {
        set_gauge(GaugeMetric::LiveSubscribers, self.subscribers.len() as f64);
    }
}
