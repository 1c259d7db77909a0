//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Market Source ===
    /// Base URL of the market quote API.
    #[serde(default = "default_market_api_url")]
    pub market_api_url: String,

    /// Maximum markets to request per scan.
    #[serde(default = "default_market_limit")]
    pub market_limit: u32,

    // === Scoring Parameters ===
    /// Minimum expected profit for a pair to be surfaced.
    #[serde(default = "default_min_profit_floor")]
    pub min_profit_floor: Decimal,

    /// Estimated execution cost as a fraction of stake (slippage + fees).
    #[serde(default = "default_execution_cost_rate")]
    pub execution_cost_rate: Decimal,

    /// Expected profit at or above which a pair can be labeled high
    /// confidence.
    #[serde(default = "default_high_profit_floor")]
    pub high_profit_floor: Decimal,

    /// Liquidity depth required for a high-confidence label.
    #[serde(default = "default_deep_liquidity_floor")]
    pub deep_liquidity_floor: Decimal,

    /// Liquidity depth below which a pair is labeled low confidence.
    #[serde(default = "default_shallow_liquidity_floor")]
    pub shallow_liquidity_floor: Decimal,

    // === Feedback ===
    /// Textual similarity above which a stored feedback label applies to a
    /// new pair.
    #[serde(default = "default_feedback_similarity_threshold")]
    pub feedback_similarity_threshold: f64,

    /// A rejected pair is still surfaced if its expected profit exceeds
    /// `min_profit_floor` times this multiplier.
    #[serde(default = "default_feedback_override_multiplier")]
    pub feedback_override_multiplier: Decimal,

    // === Clustering ===
    /// Key similarity above which an ambiguous singleton may attach to an
    /// existing cluster.
    #[serde(default = "default_cluster_similarity_threshold")]
    pub cluster_similarity_threshold: f64,

    /// Cluster size beyond which confidence is penalized for over-grouping.
    #[serde(default = "default_over_group_size")]
    pub over_group_size: usize,

    // === Scan Orchestration ===
    /// Bounded worker-pool width for per-cluster scoring.
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,

    /// Maximum opportunity notifications emitted per scan.
    #[serde(default = "default_opportunity_notification_cap")]
    pub opportunity_notification_cap: usize,

    /// Seconds an opportunity fingerprint suppresses repeat notifications.
    #[serde(default = "default_notification_dedup_window_secs")]
    pub notification_dedup_window_secs: u64,

    /// Seconds between scheduled scans in `run` mode.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    // === Trade Execution ===
    /// Base URL of the trade placement API.
    #[serde(default = "default_trade_api_url")]
    pub trade_api_url: String,

    /// Fixed delay between trade placements, honoring the external rate
    /// limit.
    #[serde(default = "default_trade_rate_limit_ms")]
    pub trade_rate_limit_ms: u64,

    /// Minimum total capital for a trade batch.
    #[serde(default = "default_min_capital")]
    pub min_capital: Decimal,

    /// Trade sizes below this unit are skipped, not errored.
    #[serde(default = "default_min_trade_unit")]
    pub min_trade_unit: Decimal,

    // === Watchlist ===
    /// Default probability-drift threshold for new watchlist entries.
    #[serde(default = "default_alert_threshold")]
    pub default_alert_threshold: Decimal,

    // === Notifications ===
    /// Optional webhook URL for email forwarding.
    #[serde(default)]
    pub email_webhook_url: Option<String>,

    /// Destination address for forwarded notifications.
    #[serde(default)]
    pub notification_email: Option<String>,

    // === HTTP ===
    /// HTTP client timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Connection pool size per host.
    #[serde(default = "default_http_pool_size")]
    pub http_pool_size: usize,

    // === Server ===
    /// HTTP server port for health/read endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    // === Identity ===
    /// Owning-user identity for CLI-driven operations. The auth system
    /// upstream emits this; locally it defaults to a fixed id.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_market_api_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}

fn default_market_limit() -> u32 {
    500
}

fn default_min_profit_floor() -> Decimal {
    Decimal::ONE // $1.00
}

fn default_execution_cost_rate() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

fn default_high_profit_floor() -> Decimal {
    Decimal::new(25, 0) // $25
}

fn default_deep_liquidity_floor() -> Decimal {
    Decimal::new(250, 0)
}

fn default_shallow_liquidity_floor() -> Decimal {
    Decimal::new(50, 0)
}

fn default_feedback_similarity_threshold() -> f64 {
    0.82
}

fn default_feedback_override_multiplier() -> Decimal {
    Decimal::new(5, 0)
}

fn default_cluster_similarity_threshold() -> f64 {
    0.80
}

fn default_over_group_size() -> usize {
    8
}

fn default_scan_concurrency() -> usize {
    8
}

fn default_opportunity_notification_cap() -> usize {
    5
}

fn default_notification_dedup_window_secs() -> u64 {
    1800
}

fn default_scan_interval_secs() -> u64 {
    300
}

fn default_trade_api_url() -> String {
    "https://api.manifold.markets/v0".to_string()
}

fn default_trade_rate_limit_ms() -> u64 {
    250
}

fn default_min_capital() -> Decimal {
    Decimal::new(10, 0) // $10
}

fn default_min_trade_unit() -> Decimal {
    Decimal::ONE
}

fn default_alert_threshold() -> Decimal {
    Decimal::new(1, 1) // 0.10
}

fn default_http_timeout_ms() -> u64 {
    5000
}

fn default_http_pool_size() -> usize {
    10
}

fn default_port() -> u16 {
    8080
}

fn default_user_id() -> String {
    "local".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.market_limit == 0 {
            return Err("MARKET_LIMIT must be positive".to_string());
        }

        if self.min_profit_floor <= Decimal::ZERO {
            return Err("MIN_PROFIT_FLOOR must be positive".to_string());
        }

        if self.execution_cost_rate >= Decimal::ONE {
            return Err("EXECUTION_COST_RATE must be less than 1.0".to_string());
        }

        if !(0.0..=1.0).contains(&self.feedback_similarity_threshold) {
            return Err("FEEDBACK_SIMILARITY_THRESHOLD must be within [0, 1]".to_string());
        }

        if !(0.0..=1.0).contains(&self.cluster_similarity_threshold) {
            return Err("CLUSTER_SIMILARITY_THRESHOLD must be within [0, 1]".to_string());
        }

        if self.scan_concurrency == 0 {
            return Err("SCAN_CONCURRENCY must be positive".to_string());
        }

        if self.min_capital <= Decimal::ZERO {
            return Err("MIN_CAPITAL must be positive".to_string());
        }

        if self.email_webhook_url.is_some() && self.notification_email.is_none() {
            return Err(
                "NOTIFICATION_EMAIL is required when EMAIL_WEBHOOK_URL is set".to_string(),
            );
        }

        Ok(())
    }
}

impl Default for Config {
    /// Configuration matching the env-var defaults, with rate limiting
    /// disabled. Used by tests and as a base for overrides.
    fn default() -> Self {
        Self {
            market_api_url: default_market_api_url(),
            market_limit: default_market_limit(),
            min_profit_floor: default_min_profit_floor(),
            execution_cost_rate: default_execution_cost_rate(),
            high_profit_floor: default_high_profit_floor(),
            deep_liquidity_floor: default_deep_liquidity_floor(),
            shallow_liquidity_floor: default_shallow_liquidity_floor(),
            feedback_similarity_threshold: default_feedback_similarity_threshold(),
            feedback_override_multiplier: default_feedback_override_multiplier(),
            cluster_similarity_threshold: default_cluster_similarity_threshold(),
            over_group_size: default_over_group_size(),
            scan_concurrency: default_scan_concurrency(),
            opportunity_notification_cap: default_opportunity_notification_cap(),
            notification_dedup_window_secs: default_notification_dedup_window_secs(),
            scan_interval_secs: default_scan_interval_secs(),
            trade_api_url: default_trade_api_url(),
            trade_rate_limit_ms: 0,
            min_capital: default_min_capital(),
            min_trade_unit: default_min_trade_unit(),
            default_alert_threshold: default_alert_threshold(),
            email_webhook_url: None,
            notification_email: None,
            http_timeout_ms: default_http_timeout_ms(),
            http_pool_size: default_http_pool_size(),
            port: default_port(),
            user_id: default_user_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_min_profit_floor(), Decimal::ONE);
        assert_eq!(default_execution_cost_rate(), Decimal::new(2, 2));
        assert_eq!(default_over_group_size(), 8);
        assert_eq!(default_scan_concurrency(), 8);
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = Config {
            scan_concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_cost_rate_at_one() {
        let config = Config {
            execution_cost_rate: Decimal::ONE,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_email_address_with_webhook() {
        let config = Config {
            email_webhook_url: Some("https://hooks.example.com/mail".to_string()),
            notification_email: None,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
