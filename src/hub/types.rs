//! Hub types and configuration

use crate::price::PriceRecord;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Subscriber identifier
pub type SubscriberId = Uuid;

/// Broadcast hub configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Pending broadcasts held before new ones are dropped
    pub queue_capacity: usize,
    /// Longest a single subscriber may take to accept a message
    pub send_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            send_timeout: Duration::from_secs(5),
        }
    }
}

impl HubConfig {
    /// Set broadcast queue capacity (minimum 1)
    pub fn queue_capacity(mut self, n: usize) -> Self {
        self.queue_capacity = n.max(1);
        self
    }

    /// Set per-subscriber send timeout
    pub fn send_timeout(mut self, d: Duration) -> Self {
        self.send_timeout = d;
        self
    }
}

/// Immutable payload fanned out to every subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastMessage {
    payload: Arc<str>,
}

impl BroadcastMessage {
    /// Wrap an already-serialized payload
    pub fn new(payload: impl Into<Arc<str>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Build the `{"data": [...]}` price update payload
    pub fn prices(records: &[PriceRecord]) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_string(&json!({ "data": records }))?;
        Ok(Self::new(payload))
    }

    /// Payload text
    pub fn as_str(&self) -> &str {
        &self.payload
    }
}

/// Why a delivery to one subscriber failed
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("connection closed")]
    Closed,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("send timed out after {0:?}")]
    TimedOut(Duration),
}

/// Errors returned to hub callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// Broadcast queue saturated; the update was dropped
    #[error("broadcast queue full, update dropped")]
    QueueFull,
    /// Hub task is no longer running
    #[error("hub is not running")]
    Closed,
}
