//! Unified error types for the arbitrage engine.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Market-source error.
    #[error("market error: {0}")]
    Market(#[from] MarketError),

    /// Scan lifecycle error.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Trade execution error.
    #[error("trade error: {0}")]
    Trade(#[from] TradeError),

    /// Notification delivery error.
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Market quote fetch and parsing errors. These are transport-level:
/// inside a scan they abort the run, inside a trade batch they are
/// captured per trade.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Quote API unreachable or returned a non-2xx status.
    #[error("failed to fetch markets: {reason}")]
    FetchFailed {
        /// Reason for failure.
        reason: String,
    },

    /// Failed to parse quote data.
    #[error("failed to parse market data: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Scan-run lifecycle errors.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Market fetch failed; the run was transitioned to `failed`.
    #[error("scan {scan_id} failed to fetch markets: {reason}")]
    MarketFetch {
        /// The scan run that was marked failed.
        scan_id: String,
        /// Underlying transport reason.
        reason: String,
    },

    /// Persistence failed during the scan.
    #[error("scan store error: {0}")]
    Store(#[from] StoreError),
}

/// Record-store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A watchlist entry for this (user, market) already exists.
    /// Recoverable condition, surfaced to the user, not a crash.
    #[error("market {market_id} is already on the watchlist")]
    DuplicateEntry {
        /// The market that was already tracked.
        market_id: String,
    },

    /// Record not found.
    #[error("record {id} not found")]
    NotFound {
        /// The missing record id.
        id: String,
    },

    /// A scan run in a terminal state was asked to transition again.
    #[error("scan run {id} is already {status} and cannot transition")]
    InvalidTransition {
        /// The scan run id.
        id: String,
        /// The terminal status it holds.
        status: String,
    },
}

/// Trade execution errors.
#[derive(Error, Debug)]
pub enum TradeError {
    /// Malformed input, rejected before any side effect.
    #[error("invalid trade request: {0}")]
    Validation(String),

    /// Available balance below requested capital; checked once up front,
    /// before any trade is placed.
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance {
        /// Requested capital.
        required: Decimal,
        /// Balance reported by the trade API.
        available: Decimal,
    },

    /// Credential rejected by the trade API.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A single trade placement failed. Captured per trade; never aborts
    /// the batch.
    #[error("trade placement failed for {market_id}: {reason}")]
    PlacementFailed {
        /// Target market.
        market_id: String,
        /// Reason from the API or transport.
        reason: String,
    },
}

/// Notification delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Email sink failed. Best-effort: logged and counted by the caller,
    /// never rolls back the stored notification.
    #[error("email send failed: {0}")]
    EmailFailed(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, EngineError>;
