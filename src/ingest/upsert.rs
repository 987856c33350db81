//! Change-detecting upsert
//!
//! A history row is written only when a symbol's price differs from its most
//! recent history entry. Comparison is exact string equality on the price
//! text. Unchanged prices only refresh the current row's observation fields.

use crate::price::{validate, PriceRecord, ValidationError};
use crate::store::{PriceStore, StoreError};
use crate::telemetry::{increment, CounterMetric};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    /// First price ever seen for the symbol
    Inserted,
    /// Price differs from the last history entry
    Changed,
    /// Same price; only observation fields refreshed
    Unchanged,
}

/// Upsert failures for a single record
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("rejected {symbol:?}: {source}")]
    Invalid {
        symbol: String,
        #[source]
        source: ValidationError,
    },
    #[error("store failed for {symbol}: {source}")]
    Store {
        symbol: String,
        #[source]
        source: StoreError,
    },
}

/// A record that did not make it into the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub symbol: String,
    pub error: String,
}

/// Per-batch accounting
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub inserted: usize,
    pub changed: usize,
    pub unchanged: usize,
    /// Records that failed validation
    pub rejected: Vec<RecordFailure>,
    /// Records whose store write failed
    pub failed: Vec<RecordFailure>,
    /// Records that were stored, in input order
    #[serde(skip)]
    pub stored: Vec<PriceRecord>,
}

impl BatchReport {
    /// Number of records written (inserted, changed or refreshed)
    pub fn stored_count(&self) -> usize {
        self.inserted + self.changed + self.unchanged
    }
}

/// Applies price records to a store with change detection
#[derive(Clone)]
pub struct PriceUpserter {
    store: Arc<dyn PriceStore>,
}

impl PriceUpserter {
    /// Create an upserter over the given store
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self { store }
    }

    /// Validate and store one record
    pub async fn upsert(&self, record: &PriceRecord) -> Result<UpsertOutcome, UpsertError> {
        validate(record).map_err(|source| UpsertError::Invalid {
            symbol: record.symbol.clone(),
            source,
        })?;

        let store_err = |source| UpsertError::Store {
            symbol: record.symbol.clone(),
            source,
        };

        let last_price = self
            .store
            .latest_history_price(&record.symbol)
            .await
            .map_err(store_err)?;

        match last_price {
            Some(last) if last == record.price => {
                let touched = self.store.touch_current(record).await.map_err(store_err)?;
                if !touched {
                    tracing::warn!(
                        symbol = %record.symbol,
                        category = %record.category,
                        "History exists but current row is missing"
                    );
                }
                Ok(UpsertOutcome::Unchanged)
            }
            last => {
                self.store
                    .record_change(record)
                    .await
                    .map_err(store_err)?;
                tracing::debug!(
                    symbol = %record.symbol,
                    previous = ?last,
                    price = %record.price,
                    "Price change recorded"
                );
                Ok(if last.is_none() {
                    UpsertOutcome::Inserted
                } else {
                    UpsertOutcome::Changed
                })
            }
        }
    }

    /// Upsert every record independently
    ///
    /// A failing record never stops the rest of the batch; failures are
    /// logged and collected into the report.
    pub async fn upsert_batch(&self, records: &[PriceRecord]) -> BatchReport {
        let mut report = BatchReport::default();

        for record in records {
            match self.upsert(record).await {
                Ok(outcome) => {
                    match outcome {
                        UpsertOutcome::Inserted => report.inserted += 1,
                        UpsertOutcome::Changed => report.changed += 1,
                        UpsertOutcome::Unchanged => report.unchanged += 1,
                    }
                    report.stored.push(record.clone());
                }
                Err(e @ UpsertError::Invalid { .. }) => {
                    tracing::warn!(error = %e, "Rejected price record");
                    report.rejected.push(RecordFailure {
                        symbol: record.symbol.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e @ UpsertError::Store { .. }) => {
                    tracing::error!(error = %e, "Failed to store price record");
                    report.failed.push(RecordFailure {
                        symbol: record.symbol.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        increment(CounterMetric::RecordInserted, report.inserted as u64);
        increment(CounterMetric::RecordChanged, report.changed as u64);
        increment(CounterMetric::RecordUnchanged, report.unchanged as u64);
        increment(CounterMetric::RecordRejected, report.rejected.len() as u64);
        increment(CounterMetric::RecordFailed, report.failed.len() as u64);

        report
    }
}
