//! HTTP client for the gold/currency market API
//!
//! One GET per tick: `<base_url>?key=<api_key>`. The upstream is slow at
//! times, so the request carries a generous but bounded timeout.

use super::payload::parse_market_response;
use super::{FetchError, MarketFetcher};
use crate::price::PriceRecord;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

/// Default market API endpoint
pub const DEFAULT_BASE_URL: &str = "https://brsapi.ir/Api/Market/Gold_Currency.php";

/// Browser-like user agent; the upstream rejects obvious bots
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Configuration for the market client
#[derive(Debug, Clone)]
pub struct MarketClientConfig {
    /// Endpoint URL, without query string
    pub base_url: String,
    /// API key sent as the `key` query parameter
    pub api_key: String,
    /// Whole-request timeout
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for MarketClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(20),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Client for the upstream market API
pub struct MarketClient {
    config: MarketClientConfig,
    client: Client,
}

impl MarketClient {
    /// Create a client with the given configuration
    pub fn new(config: MarketClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    /// Get the configuration
    pub fn config(&self) -> &MarketClientConfig {
        &self.config
    }
}

#[async_trait]
impl MarketFetcher for MarketClient {
    async fn fetch(&self) -> Result<Vec<PriceRecord>, FetchError> {
        let started = Instant::now();
        tracing::debug!(url = %self.config.base_url, "Fetching market snapshot");

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body = response.text().await?;
        let records = parse_market_response(&body)?;

        tracing::info!(
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched market snapshot"
        );

        Ok(records)
    }
}
