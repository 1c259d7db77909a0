//! Trade placement API client.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::TradeError;

/// An API key for the trade venue. Never printed: the Debug form is
/// redacted so keys cannot leak through logs or error chains.
#[derive(Clone)]
pub struct ApiCredential(String);

impl ApiCredential {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for request headers only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiCredential(***)")
    }
}

/// Account details returned by credential verification.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    /// Account username at the venue.
    pub username: String,
    /// Available balance.
    pub balance: Decimal,
}

/// Trade venue interface: credential verification and single-trade
/// placement.
#[async_trait]
pub trait TradeApi: Send + Sync {
    /// Verify a credential and return the account it belongs to.
    async fn verify_credential(&self, credential: &ApiCredential)
        -> Result<AccountInfo, TradeError>;

    /// Place one trade of `amount` on a market.
    async fn place_trade(
        &self,
        credential: &ApiCredential,
        market_id: &str,
        amount: Decimal,
    ) -> Result<(), TradeError>;
}

/// HTTP trade client against the venue's REST API.
pub struct HttpTradeClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, serde::Serialize)]
struct PlaceBetRequest<'a> {
    amount: Decimal,
    #[serde(rename = "contractId")]
    contract_id: &'a str,
    outcome: &'a str,
}

impl HttpTradeClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .pool_max_idle_per_host(config.http_pool_size)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.trade_api_url.clone(),
        }
    }
}

#[async_trait]
impl TradeApi for HttpTradeClient {
    #[instrument(skip(self, credential))]
    async fn verify_credential(
        &self,
        credential: &ApiCredential,
    ) -> Result<AccountInfo, TradeError> {
        let url = format!("{}/me", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Key {}", credential.expose()))
            .send()
            .await
            .map_err(|e| TradeError::AuthenticationFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TradeError::AuthenticationFailed(
                "credential rejected by venue".to_string(),
            ));
        }
        if !response.status().is_success() {
            return Err(TradeError::AuthenticationFailed(format!(
                "venue returned HTTP {}",
                response.status()
            )));
        }

        let account: AccountInfo = response
            .json()
            .await
            .map_err(|e| TradeError::AuthenticationFailed(e.to_string()))?;
        debug!(username = %account.username, "Credential verified");
        Ok(account)
    }

    #[instrument(skip(self, credential), fields(market = %market_id, amount = %amount))]
    async fn place_trade(
        &self,
        credential: &ApiCredential,
        market_id: &str,
        amount: Decimal,
    ) -> Result<(), TradeError> {
        let url = format!("{}/bet", self.base_url);
        let body = PlaceBetRequest {
            amount,
            contract_id: market_id,
            outcome: "YES",
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Key {}", credential.expose()))
            .json(&body)
            .send()
            .await
            .map_err(|e| TradeError::PlacementFailed {
                market_id: market_id.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TradeError::PlacementFailed {
                market_id: market_id.to_string(),
                reason: format!("venue returned HTTP {}", response.status()),
            });
        }

        debug!("Trade placed");
        Ok(())
    }
}

/// Mock trade venue with switchable failure modes and call recording.
#[derive(Debug, Clone, Default)]
pub struct MockTradeClient {
    /// Whether credential verification fails.
    pub fail_auth: bool,
    /// Balance reported on verification.
    pub balance: Decimal,
    /// Market ids whose placements fail.
    pub failing_markets: std::collections::HashSet<String>,
    placed: std::sync::Arc<std::sync::Mutex<Vec<(String, Decimal)>>>,
}

impl MockTradeClient {
    /// Create a mock venue with the given balance.
    pub fn with_balance(balance: Decimal) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Create a mock venue whose credential verification fails.
    pub fn failing_auth() -> Self {
        Self {
            fail_auth: true,
            ..Self::default()
        }
    }

    /// Mark a market's placements as failing.
    pub fn failing_market(mut self, market_id: impl Into<String>) -> Self {
        self.failing_markets.insert(market_id.into());
        self
    }

    /// Recorded (market_id, amount) placements, in call order.
    pub fn placed(&self) -> Vec<(String, Decimal)> {
        self.placed.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeApi for MockTradeClient {
    async fn verify_credential(
        &self,
        _credential: &ApiCredential,
    ) -> Result<AccountInfo, TradeError> {
        if self.fail_auth {
            return Err(TradeError::AuthenticationFailed(
                "mock auth failure".to_string(),
            ));
        }
        Ok(AccountInfo {
            username: "mock-user".to_string(),
            balance: self.balance,
        })
    }

    async fn place_trade(
        &self,
        _credential: &ApiCredential,
        market_id: &str,
        amount: Decimal,
    ) -> Result<(), TradeError> {
        if self.failing_markets.contains(market_id) {
            return Err(TradeError::PlacementFailed {
                market_id: market_id.to_string(),
                reason: "mock placement failure".to_string(),
            });
        }
        self.placed
            .lock()
            .unwrap()
            .push((market_id.to_string(), amount));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn credential_debug_is_redacted() {
        let credential = ApiCredential::new("super-secret-key");
        let debugged = format!("{:?}", credential);

        assert!(!debugged.contains("super-secret-key"));
        assert!(debugged.contains("***"));
    }

    #[tokio::test]
    async fn mock_records_placements() {
        let venue = MockTradeClient::with_balance(dec!(100));
        let credential = ApiCredential::new("k");

        venue.place_trade(&credential, "m1", dec!(10)).await.unwrap();

        let placed = venue.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0], ("m1".to_string(), dec!(10)));
    }

    #[tokio::test]
    async fn mock_failing_auth_rejects_credential() {
        let venue = MockTradeClient::failing_auth();
        let result = venue.verify_credential(&ApiCredential::new("k")).await;

        assert!(matches!(result, Err(TradeError::AuthenticationFailed(_))));
    }

    #[tokio::test]
    async fn mock_failing_market_errors() {
        let venue = MockTradeClient::with_balance(dec!(100)).failing_market("m2");
        let credential = ApiCredential::new("k");

        assert!(venue.place_trade(&credential, "m1", dec!(10)).await.is_ok());
        assert!(venue.place_trade(&credential, "m2", dec!(10)).await.is_err());
    }
}
