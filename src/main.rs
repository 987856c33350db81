use clap::Parser;
use market_tracker::cli::{Cli, Commands};
use market_tracker::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(backend) = cli.store {
        config.store.backend = backend;
    }

    market_tracker::telemetry::init_logging(
        &config.telemetry.log_level,
        config.telemetry.log_format,
    )?;

    match cli.command {
        Commands::Serve(args) => {
            tracing::info!("Starting market tracker");
            args.execute(&config).await?;
        }
        Commands::Fetch(args) => args.execute(&config).await?,
        Commands::Prices(args) => args.execute(&config).await?,
        Commands::Timeline(args) => args.execute(&config).await?,
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}
