//! Price storage
//!
//! Current price per `(symbol, category)` plus an append-only change history.
//! The change-detecting upsert in [`crate::ingest`] composes the primitives
//! exposed here; implementations only guarantee that [`PriceStore::record_change`]
//! is atomic.

mod memory;
mod sqlite;

pub use memory::MemoryPriceStore;
pub use sqlite::SqlitePriceStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::price::{Category, CurrentPrice, HistoryEntry, PriceRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Write refused by the store
    #[error("write failed for {symbol}: {reason}")]
    WriteFailed { symbol: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable keyed price storage
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Price of the most recent history entry for `symbol`
    async fn latest_history_price(&self, symbol: &str) -> StoreResult<Option<String>>;

    /// Refresh observation date/time and the update timestamp of an existing
    /// current row. Returns `false` if no row exists.
    async fn touch_current(&self, record: &PriceRecord) -> StoreResult<bool>;

    /// Upsert the current row and append a history entry, atomically
    async fn record_change(&self, record: &PriceRecord) -> StoreResult<()>;

    /// Current prices in one category, ordered by symbol
    async fn list(&self, category: &Category) -> StoreResult<Vec<CurrentPrice>>;

    /// Most recent `limit` history entries for `symbol`, newest first
    async fn history(&self, symbol: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>>;

    /// Current prices, optionally filtered by category, newest-created first
    async fn all(&self, category: Option<&Category>) -> StoreResult<Vec<CurrentPrice>>;
}

/// Open the store selected by configuration
pub async fn open(config: &StoreConfig) -> StoreResult<Arc<dyn PriceStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory price store");
            Ok(Arc::new(MemoryPriceStore::new()))
        }
        StoreBackend::Sqlite => {
            let store =
                SqlitePriceStore::connect(&config.database_url, config.max_connections).await?;
            Ok(Arc::new(store))
        }
    }
}
