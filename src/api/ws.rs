//! WebSocket subscribers
//!
//! Each upgraded connection is split: the write half is handed to the hub as
//! a [`Subscriber`], and this module keeps reading the other half only to
//! notice when the client goes away.

use super::AppState;
use crate::hub::{BroadcastMessage, DeliveryError, HubHandle, Subscriber, SubscriberId};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

/// Write half of a client WebSocket
pub struct WsSubscriber {
    id: SubscriberId,
    sink: SplitSink<WebSocket, Message>,
}

impl WsSubscriber {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sink,
        }
    }
}

#[async_trait]
impl Subscriber for WsSubscriber {
    fn id(&self) -> SubscriberId {
        self.id
    }

    async fn deliver(&mut self, message: &BroadcastMessage) -> Result<(), DeliveryError> {
        self.sink
            .send(Message::Text(message.as_str().to_owned()))
            .await
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            tracing::debug!(subscriber = %self.id, error = %e, "WebSocket close failed");
        }
    }
}

/// `GET /ws` upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Register the connection, then drain client frames until it closes
async fn handle_socket(socket: WebSocket, hub: HubHandle) {
    let (sink, mut stream) = socket.split();
    let subscriber = WsSubscriber::new(sink);
    let id = subscriber.id();

    match hub.register(Box::new(subscriber)).await {
        Ok(_) => tracing::debug!(subscriber = %id, "WebSocket client connected"),
        Err(e) => {
            tracing::warn!(error = %e, "Hub unavailable, dropping WebSocket client");
            return;
        }
    }

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(subscriber = %id, error = %e, "WebSocket read failed");
                break;
            }
        }
    }

    // The hub may already have dropped us after a failed delivery
    if let Err(e) = hub.unregister(id).await {
        tracing::debug!(subscriber = %id, error = %e, "Unregister after disconnect failed");
    }
    tracing::debug!(subscriber = %id, "WebSocket client disconnected");
}
