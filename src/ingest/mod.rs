//! Ingestion pipeline
//!
//! Fetch a market snapshot, upsert each record with change detection, then
//! hand the stored records to the update callback. A [`Scheduler`] repeats
//! this on a fixed interval.

mod scheduler;
mod upsert;

pub use scheduler::{interval_from_minutes, Scheduler, SchedulerHandle};
pub use upsert::{BatchReport, PriceUpserter, RecordFailure, UpsertError, UpsertOutcome};

use crate::market::MarketFetcher;
use crate::price::PriceRecord;
use crate::store::PriceStore;
use crate::telemetry::{increment, CounterMetric};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Receives the records stored by each successful pass
pub type UpdateCallback = Arc<dyn Fn(&[PriceRecord]) + Send + Sync>;

/// Result of one ingestion pass
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassOutcome {
    /// Fetch succeeded and the batch was applied
    Completed { report: BatchReport },
    /// Another pass was already running
    Skipped,
    /// Fetch failed; nothing was written
    FetchFailed { error: String },
}

/// Runs fetch, upsert and notify as one pass
///
/// Passes never overlap: a pass requested while another is in flight is
/// skipped.
pub struct Ingestor {
    fetcher: Arc<dyn MarketFetcher>,
    upserter: PriceUpserter,
    on_update: Option<UpdateCallback>,
    running: Mutex<()>,
}

impl Ingestor {
    /// Create an ingestor without an update callback
    pub fn new(fetcher: Arc<dyn MarketFetcher>, store: Arc<dyn PriceStore>) -> Self {
        Self {
            fetcher,
            upserter: PriceUpserter::new(store),
            on_update: None,
            running: Mutex::new(()),
        }
    }

    /// Set the callback invoked after each successful pass
    pub fn with_update_callback(mut self, callback: UpdateCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    /// Run one pass
    pub async fn run_pass(&self) -> PassOutcome {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::info!("Ingestion pass already running, skipping");
            increment(CounterMetric::PassSkipped, 1);
            return PassOutcome::Skipped;
        };

        let records = match self.fetcher.fetch().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Market fetch failed, skipping tick");
                increment(CounterMetric::PassFailed, 1);
                return PassOutcome::FetchFailed {
                    error: e.to_string(),
                };
            }
        };

        let report = self.upserter.upsert_batch(&records).await;
        tracing::info!(
            fetched = records.len(),
            inserted = report.inserted,
            changed = report.changed,
            unchanged = report.unchanged,
            rejected = report.rejected.len(),
            failed = report.failed.len(),
            "Ingestion pass complete"
        );

        if let Some(callback) = &self.on_update {
            callback(&report.stored);
        }

        increment(CounterMetric::PassCompleted, 1);
        PassOutcome::Completed { report }
    }
}
