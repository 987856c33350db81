//! Serve command implementation

use crate::api::{self, AppState};
use crate::config::Config;
use crate::hub::BroadcastHub;
use crate::ingest::{Ingestor, Scheduler};
use crate::market::MarketClient;
use crate::store;
use crate::telemetry::install_metrics_exporter;
use anyhow::Context;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Do not poll on a schedule; passes run only via the fetch endpoint
    #[arg(long)]
    pub no_scheduler: bool,
}

impl ServeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if config.fetcher.api_key.is_empty() {
            tracing::warn!("No market API key configured; upstream requests will likely fail");
        }

        let store = store::open(&config.store)
            .await
            .context("Failed to open price store")?;
        let hub = BroadcastHub::spawn(config.hub_config());
        let client = MarketClient::new(config.market_client_config())?;

        let ingestor = Arc::new(
            Ingestor::new(Arc::new(client), store.clone())
                .with_update_callback(hub.price_update_callback()),
        );

        let scheduler = if self.no_scheduler {
            None
        } else {
            Some(Scheduler::new(ingestor.clone(), config.fetch_interval()).spawn())
        };

        if let Some(port) = config.telemetry.metrics_port {
            install_metrics_exporter(port)?;
        }

        let app = api::router(AppState {
            store,
            ingestor,
            hub,
        });

        let addr = format!(
            "{}:{}",
            config.server.host,
            self.port.unwrap_or(config.server.port)
        );
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!(%addr, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
        tracing::info!("Shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
