//! Subscriber connections owned by the hub

use super::types::{BroadcastMessage, DeliveryError, SubscriberId};
use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A live outbound connection
///
/// Once registered, the hub is the only caller of these methods.
#[async_trait]
pub trait Subscriber: Send {
    /// Stable identifier for this connection
    fn id(&self) -> SubscriberId;

    /// Write one message to the connection
    async fn deliver(&mut self, message: &BroadcastMessage) -> Result<(), DeliveryError>;

    /// Release the connection
    async fn close(&mut self);
}

/// Subscriber that forwards messages into a bounded channel
///
/// Useful for in-process consumers; the receiving side owns the other end.
pub struct ChannelSubscriber {
    id: SubscriberId,
    tx: mpsc::Sender<BroadcastMessage>,
}

impl ChannelSubscriber {
    /// Create a subscriber and the receiver that will see its messages
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BroadcastMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    fn id(&self) -> SubscriberId {
        self.id
    }

    async fn deliver(&mut self, message: &BroadcastMessage) -> Result<(), DeliveryError> {
        self.tx
            .send(message.clone())
            .await
            .map_err(|_| DeliveryError::Closed)
    }

    async fn close(&mut self) {
        // Dropping the sender closes the receiver once the hub drops us
    }
}
