//! Prometheus metrics
//!
//! Thin wrappers over the `metrics` facade so call sites name metrics by
//! enum instead of by string. Without an installed recorder every call is a
//! no-op.

/// Counter metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMetric {
    /// Ingestion pass applied a fetched batch
    PassCompleted,
    /// Ingestion pass skipped because another was running
    PassSkipped,
    /// Ingestion pass aborted by a fetch failure
    PassFailed,
    /// First observation of a symbol
    RecordInserted,
    /// Price differed from the latest history entry
    RecordChanged,
    /// Price matched the latest history entry
    RecordUnchanged,
    /// Record failed validation
    RecordRejected,
    /// Store write failed
    RecordFailed,
    /// Message accepted by a subscriber
    BroadcastDelivered,
    /// Broadcast dropped on a full queue
    BroadcastDropped,
    /// Subscriber removed after a failure or unregister
    SubscriberRemoved,
}

impl CounterMetric {
    /// Exported metric name
    pub fn name(self) -> &'static str {
        match self {
            CounterMetric::PassCompleted => "market_tracker_passes_completed_total",
            CounterMetric::PassSkipped => "market_tracker_passes_skipped_total",
            CounterMetric::PassFailed => "market_tracker_passes_failed_total",
            CounterMetric::RecordInserted => "market_tracker_records_inserted_total",
            CounterMetric::RecordChanged => "market_tracker_records_changed_total",
            CounterMetric::RecordUnchanged => "market_tracker_records_unchanged_total",
            CounterMetric::RecordRejected => "market_tracker_records_rejected_total",
            CounterMetric::RecordFailed => "market_tracker_records_failed_total",
            CounterMetric::BroadcastDelivered => "market_tracker_broadcasts_delivered_total",
            CounterMetric::BroadcastDropped => "market_tracker_broadcasts_dropped_total",
            CounterMetric::SubscriberRemoved => "market_tracker_subscribers_removed_total",
        }
    }
}

/// Gauge metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeMetric {
    /// Subscribers currently registered with the hub
    LiveSubscribers,
}

impl GaugeMetric {
    /// Exported metric name
    pub fn name(self) -> &'static str {
        match self {
            GaugeMetric::LiveSubscribers => "market_tracker_live_subscribers",
        }
    }
}

/// Add to a counter
pub fn increment(metric: CounterMetric, value: u64) {
    if value == 0 {
        return;
    }
    ::metrics::counter!(metric.name()).increment(value);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}
