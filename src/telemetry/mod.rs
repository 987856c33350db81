//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{increment, set_gauge, CounterMetric, GaugeMetric};

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Serve Prometheus metrics on `0.0.0.0:<port>/metrics`
///
/// Must be called from within a tokio runtime.
pub fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}
