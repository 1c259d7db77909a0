//! Market snapshots and the quote-source interface.

pub mod client;
pub mod mock;
pub mod types;

pub use client::{GammaMarketSource, MarketSource};
pub use mock::{MockMarketSource, MockSourceConfig};
pub use types::{Market, MarketFilter, OutcomeType};
