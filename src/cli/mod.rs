//! CLI interface for market-tracker
//!
//! Provides subcommands for:
//! - `serve`: Scheduler, broadcast hub and HTTP server
//! - `fetch`: Run a single ingestion pass
//! - `prices`: List current prices
//! - `timeline`: Show a symbol's change history
//! - `config`: Show the effective configuration

mod fetch;
mod query;
mod serve;

pub use fetch::FetchArgs;
pub use query::{PricesArgs, TimelineArgs};
pub use serve::ServeArgs;

use crate::config::StoreBackend;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "market-tracker")]
#[command(about = "Polls market prices, keeps change history and streams updates")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured store backend
    #[arg(long, global = true, value_enum)]
    pub store: Option<StoreBackend>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler, broadcast hub and HTTP server
    Serve(ServeArgs),
    /// Run one ingestion pass and print a summary
    Fetch(FetchArgs),
    /// List current prices
    Prices(PricesArgs),
    /// Show recent price changes for a symbol
    Timeline(TimelineArgs),
    /// Show effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["market-tracker", "serve", "--port", "3000"]);
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.port, Some(3000)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_options_after_subcommand() {
        let cli = Cli::parse_from([
            "market-tracker",
            "timeline",
            "--symbol",
            "USD",
            "--store",
            "memory",
            "--config",
            "tracker.toml",
        ]);
        assert_eq!(cli.store, Some(StoreBackend::Memory));
        assert_eq!(cli.config, Some(PathBuf::from("tracker.toml")));
        match cli.command {
            Commands::Timeline(args) => {
                assert_eq!(args.symbol, "USD");
                assert_eq!(args.limit, 24);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_timeline_requires_symbol() {
        assert!(Cli::try_parse_from(["market-tracker", "timeline"]).is_err());
    }
}
