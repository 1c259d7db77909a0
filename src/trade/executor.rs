//! Capital allocation and sequential trade placement.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::TradeError;
use crate::metrics;
use crate::utils::truncate_label;

use super::client::{ApiCredential, TradeApi};

/// One requested trade: a market and its share of the batch capital.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeTarget {
    /// Market to trade.
    pub market_id: String,
    /// Question text, used to identify the target in error reports.
    pub question: String,
    /// Share of the batch capital, in percent.
    pub allocation_percent: Decimal,
}

/// Outcome of a trade batch. Placement failures never abort the batch;
/// they are captured here per target.
#[derive(Debug, Clone, Serialize)]
pub struct TradeExecutionResult {
    /// Trades placed successfully.
    pub trades_executed: usize,
    /// One message per failed placement, identifying the target.
    pub errors: Vec<String>,
    /// Targets requested.
    pub requested_count: usize,
    /// Targets whose allocation rounded below the minimum trade unit.
    pub skipped: usize,
}

/// Places a batch of trades sequentially against the venue, honoring its
/// rate limit. Balance is checked once up front; a placement failure is
/// recorded and the batch continues. Failed placements are never retried
/// automatically.
pub struct TradeExecutor {
    api: Arc<dyn TradeApi>,
    config: Config,
}

impl TradeExecutor {
    /// Wire up an executor over a trade venue.
    pub fn new(api: Arc<dyn TradeApi>, config: Config) -> Self {
        Self { api, config }
    }

    /// Execute a trade batch: validate, verify the credential and
    /// balance, then place each target's trade in order.
    #[instrument(skip(self, credential, targets), fields(capital = %capital, targets = targets.len()))]
    pub async fn execute(
        &self,
        credential: &ApiCredential,
        capital: Decimal,
        targets: &[TradeTarget],
    ) -> Result<TradeExecutionResult, TradeError> {
        self.validate(capital, targets)?;

        let account = self.api.verify_credential(credential).await?;
        if account.balance < capital {
            return Err(TradeError::InsufficientBalance {
                required: capital,
                available: account.balance,
            });
        }
        info!(username = %account.username, "Credential verified, placing trades");

        let mut result = TradeExecutionResult {
            trades_executed: 0,
            errors: Vec::new(),
            requested_count: targets.len(),
            skipped: 0,
        };

        for (i, target) in targets.iter().enumerate() {
            let amount = (capital * target.allocation_percent / Decimal::ONE_HUNDRED).floor();
            if amount < self.config.min_trade_unit {
                result.skipped += 1;
                continue;
            }

            if i > 0 && self.config.trade_rate_limit_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(
                    self.config.trade_rate_limit_ms,
                ))
                .await;
            }

            match self
                .api
                .place_trade(credential, &target.market_id, amount)
                .await
            {
                Ok(()) => {
                    result.trades_executed += 1;
                    metrics::inc_trades_placed();
                }
                Err(e) => {
                    warn!(market = %target.market_id, error = %e, "Trade placement failed");
                    metrics::inc_trades_failed();
                    result
                        .errors
                        .push(format!("{}: {}", truncate_label(&target.question, 50), e));
                }
            }
        }

        info!(
            executed = result.trades_executed,
            failed = result.errors.len(),
            skipped = result.skipped,
            "Trade batch finished"
        );
        Ok(result)
    }

    /// Reject malformed batches before any side effect. Allocations may
    /// sum to less than 100% (the remainder stays unspent), but a sum
    /// above 100% would commit more than the verified balance covers, so
    /// it is rejected here.
    fn validate(&self, capital: Decimal, targets: &[TradeTarget]) -> Result<(), TradeError> {
        if targets.is_empty() {
            return Err(TradeError::Validation("no trade targets given".to_string()));
        }
        if capital < self.config.min_capital {
            return Err(TradeError::Validation(format!(
                "capital {} below the minimum {}",
                capital, self.config.min_capital
            )));
        }
        for target in targets {
            if target.allocation_percent < Decimal::ZERO {
                return Err(TradeError::Validation(format!(
                    "negative allocation for market {}",
                    target.market_id
                )));
            }
        }
        let total: Decimal = targets.iter().map(|t| t.allocation_percent).sum();
        if total > Decimal::ONE_HUNDRED {
            return Err(TradeError::Validation(format!(
                "allocations sum to {total}%, exceeding 100%"
            )));
        }
        Ok(())
    }
}
