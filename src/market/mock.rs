//! Mock market source for unit testing.
//!
//! Serves configured snapshots without network access, with switchable
//! failure modes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::MarketError;

use super::client::MarketSource;
use super::types::{Market, MarketFilter};

/// Configuration for mock source behavior.
#[derive(Debug, Clone, Default)]
pub struct MockSourceConfig {
    /// Whether fetches should fail with a transport error.
    pub fail_fetch: bool,
    /// Simulated latency in milliseconds.
    pub latency_ms: u64,
}

/// Mock market source for testing.
#[derive(Debug, Clone, Default)]
pub struct MockMarketSource {
    /// Mock configuration.
    config: MockSourceConfig,
    /// Snapshots to serve.
    markets: Arc<Mutex<Vec<Market>>>,
}

impl MockMarketSource {
    /// Create a mock source serving the given snapshots.
    pub fn with_markets(markets: Vec<Market>) -> Self {
        Self {
            config: MockSourceConfig::default(),
            markets: Arc::new(Mutex::new(markets)),
        }
    }

    /// Create a mock source with custom behavior.
    pub fn with_config(config: MockSourceConfig) -> Self {
        Self {
            config,
            markets: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replace the served snapshots.
    pub fn set_markets(&self, markets: Vec<Market>) {
        *self.markets.lock().unwrap() = markets;
    }
}

#[async_trait]
impl MarketSource for MockMarketSource {
    async fn fetch_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>, MarketError> {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.config.fail_fetch {
            return Err(MarketError::FetchFailed {
                reason: "mock fetch failure".to_string(),
            });
        }

        let markets = self.markets.lock().unwrap();
        Ok(markets.iter().filter(|m| filter.matches(m)).cloned().collect())
    }
}
