//! In-memory price store

use super::{PriceStore, StoreResult};
use crate::price::{Category, CurrentPrice, HistoryEntry, PriceRecord};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
#[cfg(test)]
use std::collections::HashSet;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    current: HashMap<(String, Category), CurrentPrice>,
    history: Vec<HistoryEntry>,
    #[cfg(test)]
    fail_next: HashSet<String>,
    #[cfg(test)]
    writes: usize,
}

/// Price store backed by process memory
///
/// Every operation runs under one lock, so `record_change` is trivially
/// atomic. Used by tests and by `--store memory`.
#[derive(Default)]
pub struct MemoryPriceStore {
    inner: Mutex<Inner>,
}

impl MemoryPriceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `record_change` for `symbol` fail without writing
    #[cfg(test)]
    pub async fn fail_next_change(&self, symbol: impl Into<String>) {
        self.inner.lock().await.fail_next.insert(symbol.into());
    }

    /// Number of successful writes (touches and changes) so far
    #[cfg(test)]
    pub async fn write_count(&self) -> usize {
        self.inner.lock().await.writes
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn latest_history_price(&self, symbol: &str) -> StoreResult<Option<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .history
            .iter()
            .rev()
            .find(|entry| entry.symbol == symbol)
            .map(|entry| entry.price.clone()))
    }

    async fn touch_current(&self, record: &PriceRecord) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        let key = (record.symbol.clone(), record.category.clone());
        let Some(row) = inner.current.get_mut(&key) else {
            return Ok(false);
        };
        row.date = record.date.clone();
        row.time = record.time.clone();
        row.updated_at = Utc::now();
        #[cfg(test)]
        {
            inner.writes += 1;
        }
        Ok(true)
    }

    async fn record_change(&self, record: &PriceRecord) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        #[cfg(test)]
        {
            if inner.fail_next.remove(&record.symbol) {
                return Err(super::StoreError::WriteFailed {
                    symbol: record.symbol.clone(),
                    reason: "injected failure".to_string(),
                });
            }
        }

        let now = Utc::now();
        let key = (record.symbol.clone(), record.category.clone());
        inner
            .current
            .entry(key)
            .and_modify(|row| {
                row.price = record.price.clone();
                row.date = record.date.clone();
                row.time = record.time.clone();
                row.updated_at = now;
            })
            .or_insert_with(|| CurrentPrice {
                symbol: record.symbol.clone(),
                category: record.category.clone(),
                name: record.name.clone(),
                price: record.price.clone(),
                unit: record.unit.clone(),
                date: record.date.clone(),
                time: record.time.clone(),
                created_at: now,
                updated_at: now,
            });
        inner.history.push(HistoryEntry {
            symbol: record.symbol.clone(),
            category: record.category.clone(),
            price: record.price.clone(),
            recorded_at: now,
        });
        #[cfg(test)]
        {
            inner.writes += 1;
        }
        Ok(())
    }

    async fn list(&self, category: &Category) -> StoreResult<Vec<CurrentPrice>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<CurrentPrice> = inner
            .current
            .values()
            .filter(|row| &row.category == category)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(rows)
    }

    async fn history(&self, symbol: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .history
            .iter()
            .rev()
            .filter(|entry| entry.symbol == symbol)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn all(&self, category: Option<&Category>) -> StoreResult<Vec<CurrentPrice>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<CurrentPrice> = inner
            .current
            .values()
            .filter(|row| category.map_or(true, |c| &row.category == c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        Ok(rows)
    }
}
