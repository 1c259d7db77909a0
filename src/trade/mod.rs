//! Trade venue client and batch execution.

pub mod client;
pub mod executor;

pub use client::{AccountInfo, ApiCredential, HttpTradeClient, MockTradeClient, TradeApi};
pub use executor::{TradeExecutionResult, TradeExecutor, TradeTarget};
