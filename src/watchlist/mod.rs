//! Watchlist tracking and drift alerting.

pub mod tracker;

pub use tracker::{AlertState, WatchlistAlert, WatchlistEntry, WatchlistTracker};
