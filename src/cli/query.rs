//! Read-only query commands

use crate::config::Config;
use crate::price::Category;
use crate::store;
use clap::Args;

#[derive(Args, Debug)]
pub struct PricesArgs {
    /// Only show this category (gold, currency, cryptocurrency, ...)
    #[arg(short = 't', long = "category")]
    pub category: Option<String>,
}

impl PricesArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = store::open(&config.store).await?;
        let category = self.category.as_deref().map(Category::from_name);
        let rows = store.all(category.as_ref()).await?;

        if rows.is_empty() {
            println!("No prices stored");
            return Ok(());
        }

        println!(
            "{:<20} {:<16} {:>20} {:<10} {}",
            "SYMBOL", "TYPE", "PRICE", "UNIT", "UPDATED"
        );
        for row in rows {
            println!(
                "{:<20} {:<16} {:>20} {:<10} {}",
                row.symbol,
                row.category.as_str(),
                row.price,
                row.unit,
                row.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// Symbol to show
    #[arg(short, long)]
    pub symbol: String,

    /// Maximum number of entries
    #[arg(short, long, default_value_t = 24)]
    pub limit: usize,
}

impl TimelineArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = store::open(&config.store).await?;
        let entries = store.history(&self.symbol, self.limit.max(1)).await?;

        if entries.is_empty() {
            println!("No history for {}", self.symbol);
            return Ok(());
        }

        println!("{} ({} changes, newest first)", self.symbol, entries.len());
        for entry in entries {
            println!(
                "  {}  {:>20}",
                entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                entry.price
            );
        }
        Ok(())
    }
}
