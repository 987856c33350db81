//! HTTP and WebSocket surface
//!
//! REST endpoints read from the price store and can trigger an ingestion
//! pass; `/ws` connections become hub subscribers for live updates.

mod handlers;
mod ws;

pub use ws::WsSubscriber;

use crate::hub::HubHandle;
use crate::ingest::Ingestor;
use crate::store::PriceStore;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Shared state for every request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PriceStore>,
    pub ingestor: Arc<Ingestor>,
    pub hub: HubHandle,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/prices", get(handlers::prices_by_category))
        .route("/api/v1/prices/all", get(handlers::all_prices))
        .route("/api/v1/prices/timeline", get(handlers::timeline))
        .route(
            "/api/v1/prices/fetch",
            get(handlers::fetch_now).post(handlers::fetch_now),
        )
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(handlers::health))
        .with_state(state)
}
