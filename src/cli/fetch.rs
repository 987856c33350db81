//! Fetch command implementation

use crate::config::Config;
use crate::ingest::{Ingestor, PassOutcome};
use crate::market::MarketClient;
use crate::store;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Print the pass outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl FetchArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = store::open(&config.store).await?;
        let client = MarketClient::new(config.market_client_config())?;
        let ingestor = Ingestor::new(Arc::new(client), store);

        let outcome = ingestor.run_pass().await;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        match outcome {
            PassOutcome::Completed { report } => {
                if !self.json {
                    println!("Ingestion pass complete");
                    println!("  Inserted:  {}", report.inserted);
                    println!("  Changed:   {}", report.changed);
                    println!("  Unchanged: {}", report.unchanged);
                    println!("  Rejected:  {}", report.rejected.len());
                    println!("  Failed:    {}", report.failed.len());
                    for failure in report.rejected.iter().chain(report.failed.iter()) {
                        println!("    {}: {}", failure.symbol, failure.error);
                    }
                }
                Ok(())
            }
            PassOutcome::Skipped => Ok(()),
            PassOutcome::FetchFailed { error } => anyhow::bail!("Market fetch failed: {}", error),
        }
    }
}
