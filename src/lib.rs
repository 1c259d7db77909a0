//! Prediction-market arbitrage scan and execution engine.
//!
//! Finds markets on different venues (or duplicated on one venue) that
//! price the same real-world event differently, surfaces the gap as an
//! opportunity, and optionally places a trade batch against it.
//!
//! # Pipeline
//!
//! ```text
//! fetch markets ──► cluster by canonical event ──► score pairs
//!                                                      │
//!        notifications ◄── record scan run ◄───────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Market snapshots and the quote-source client
//! - [`cluster`]: Canonical-event normalization and grouping
//! - [`scoring`]: Pair scoring with human-feedback adjustment
//! - [`scan`]: Scan-run lifecycle and orchestration
//! - [`notify`]: Notifications, dedup and email forwarding
//! - [`watchlist`]: Tracked markets and drift alerts
//! - [`trade`]: Trade venue client and batch execution
//! - [`api`]: HTTP API for health/status/records
//! - [`utils`]: Utility functions

pub mod api;
pub mod cluster;
pub mod config;
pub mod error;
pub mod market;
pub mod metrics;
pub mod notify;
pub mod scan;
pub mod scoring;
pub mod trade;
pub mod utils;
pub mod watchlist;

pub use config::Config;
pub use error::{EngineError, Result};
