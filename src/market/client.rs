//! Market quote API client.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::MarketError;

use super::types::{Market, MarketFilter, OutcomeType};

/// Read-only source of tradable market snapshots.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Fetch the current universe of open markets.
    async fn fetch_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>, MarketError>;
}

/// Gamma-style quote API client.
#[derive(Debug, Clone)]
pub struct GammaMarketSource {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL for the quote API.
    base_url: String,
    /// Default page size.
    limit: u32,
}

/// Raw market record as returned by the quote API. Prices and depth come
/// back as strings; absent fields are tolerated.
#[derive(Debug, Clone, Deserialize)]
struct RawMarket {
    /// Market ID.
    id: Option<String>,
    /// Question text.
    question: Option<String>,
    /// Outcome prices as a JSON-encoded string array.
    #[serde(rename = "outcomePrices")]
    outcome_prices: Option<String>,
    /// Last traded price, fallback when outcome prices are absent.
    #[serde(rename = "lastTradePrice")]
    last_trade_price: Option<serde_json::Value>,
    /// Liquidity depth.
    #[serde(rename = "liquidityNum")]
    liquidity: Option<serde_json::Value>,
    /// Traded volume.
    #[serde(rename = "volumeNum")]
    volume: Option<serde_json::Value>,
    /// Market kind reported by the source.
    #[serde(rename = "marketType")]
    market_type: Option<String>,
    /// Grouping tags.
    #[serde(default)]
    events: Vec<RawEvent>,
    /// Public slug.
    slug: Option<String>,
}

/// Event grouping attached to a raw market.
#[derive(Debug, Clone, Deserialize)]
struct RawEvent {
    /// Event title used as a grouping tag.
    title: Option<String>,
}

impl GammaMarketSource {
    /// Create a new quote client from config with tuned HTTP settings.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(std::time::Duration::from_millis(500))
            .tcp_nodelay(true)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(config.http_pool_size)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: config.market_api_url.clone(),
            limit: config.market_limit,
        }
    }

    /// Convert a raw API record into a market snapshot. Records without an
    /// id, question or usable price are dropped.
    fn convert(&self, raw: RawMarket) -> Option<Market> {
        // Read the price while the record is still whole; moving the id
        // and question out first would leave nothing to borrow.
        let probability = parse_probability(&raw)?;
        let id = raw.id?;
        let question = raw.question?;

        if probability < Decimal::ZERO || probability > Decimal::ONE {
            warn!(market = %id, probability = %probability, "Price out of range, dropping");
            return None;
        }

        let outcome_type = raw
            .market_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(OutcomeType::Binary);

        let group_tags = raw
            .events
            .into_iter()
            .filter_map(|e| e.title)
            .collect::<Vec<_>>();

        Some(Market {
            id,
            question,
            probability,
            liquidity: raw.liquidity.as_ref().and_then(parse_decimal),
            volume: raw.volume.as_ref().and_then(parse_decimal),
            outcome_type,
            group_tags,
            url: raw.slug.map(|s| format!("https://polymarket.com/event/{}", s)),
        })
    }
}

/// Parse the implied probability from outcome prices, falling back to the
/// last traded price.
fn parse_probability(raw: &RawMarket) -> Option<Decimal> {
    if let Some(ref prices) = raw.outcome_prices {
        if let Ok(parsed) = serde_json::from_str::<Vec<String>>(prices) {
            if let Some(first) = parsed.first() {
                if let Ok(p) = first.parse() {
                    return Some(p);
                }
            }
        }
    }
    raw.last_trade_price.as_ref().and_then(parse_decimal)
}

/// Parse a decimal that the API may encode as a number or a string.
fn parse_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl MarketSource for GammaMarketSource {
    #[instrument(skip(self, filter))]
    async fn fetch_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>, MarketError> {
        let url = format!("{}/markets", self.base_url);
        let limit = filter.limit.unwrap_or(self.limit);

        let response = self
            .http
            .get(&url)
            .query(&[("closed", "false"), ("limit", &limit.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MarketError::FetchFailed {
                reason: format!("HTTP {}", response.status()),
            });
        }

        let raw: Vec<RawMarket> = response
            .json()
            .await
            .map_err(|e| MarketError::ParseError(format!("failed to parse markets: {}", e)))?;

        let markets: Vec<Market> = raw
            .into_iter()
            .filter_map(|r| self.convert(r))
            .filter(|m| filter.matches(m))
            .collect();

        debug!(count = markets.len(), "Fetched market snapshots");

        Ok(markets)
    }
}
