//! REST handlers

use super::AppState;
use crate::hub::HubError;
use crate::ingest::PassOutcome;
use crate::price::Category;
use crate::store::StoreError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const DEFAULT_TIMELINE_LIMIT: usize = 24;
const MAX_TIMELINE_LIMIT: usize = 1_000;

/// Errors surfaced to HTTP clients as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Hub(#[from] HubError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(e) => {
                tracing::error!(error = %e, "Store query failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Hub(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    #[serde(rename = "type")]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    symbol: Option<String>,
    limit: Option<usize>,
}

/// `GET /api/v1/prices?type=` - current prices in one category
pub async fn prices_by_category(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let category = query
        .category
        .filter(|c| !c.trim().is_empty())
        .map(|c| Category::from_name(&c))
        .ok_or_else(|| ApiError::BadRequest("query parameter 'type' is required".into()))?;

    let rows = state.store.list(&category).await?;
    Ok(Json(json!({ "data": rows })))
}

/// `GET /api/v1/prices/all?type=` - every current price, optionally filtered
pub async fn all_prices(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let category = query
        .category
        .filter(|c| !c.trim().is_empty())
        .map(|c| Category::from_name(&c));

    let rows = state.store.all(category.as_ref()).await?;
    Ok(Json(json!({ "data": rows })))
}

/// `GET /api/v1/prices/timeline?symbol=&limit=` - change history, newest first
pub async fn timeline(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let symbol = query
        .symbol
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("query parameter 'symbol' is required".into()))?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TIMELINE_LIMIT)
        .clamp(1, MAX_TIMELINE_LIMIT);

    let entries = state.store.history(&symbol, limit).await?;
    Ok(Json(json!({ "timeline": entries })))
}

/// `POST|GET /api/v1/prices/fetch` - run one ingestion pass now
pub async fn fetch_now(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.ingestor.run_pass().await;
    let status = match &outcome {
        PassOutcome::Completed { .. } => StatusCode::OK,
        PassOutcome::Skipped => StatusCode::CONFLICT,
        PassOutcome::FetchFailed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(outcome))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let subscribers = state.hub.live_subscribers().await?.len();
    Ok(Json(json!({ "status": "ok", "subscribers": subscribers })))
}
