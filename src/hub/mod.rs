//! Subscriber broadcast hub
//!
//! Pushes serialized price updates to every live subscriber with per-send
//! timeouts, so a slow or broken connection cannot stall the others.

mod actor;
mod subscriber;
mod types;

pub use actor::{BroadcastHub, HubHandle};
pub use subscriber::{ChannelSubscriber, Subscriber};
pub use types::{BroadcastMessage, DeliveryError, HubConfig, HubError, SubscriberId};
