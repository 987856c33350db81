//! Market data fetching
//!
//! Pulls the gold/currency/crypto snapshot from the upstream market API and
//! normalizes it into [`PriceRecord`]s.

mod client;
mod payload;

pub use client::{MarketClient, MarketClientConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
pub use payload::{normalize_price, parse_market_response};

use crate::price::PriceRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Fetch failures; each one skips the current tick
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or timeout
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Upstream answered with a non-2xx status
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    /// Body was not the expected JSON object
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of normalized price records
#[async_trait]
pub trait MarketFetcher: Send + Sync {
    /// Fetch one snapshot of all categories
    async fn fetch(&self) -> Result<Vec<PriceRecord>, FetchError>;
}
