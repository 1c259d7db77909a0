//! Feedback-adjusted opportunity scoring over cluster pairs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, instrument};

use crate::cluster::ClusterResult;
use crate::config::Config;
use crate::market::Market;

use super::feedback::FeedbackStore;

/// Qualitative certainty label on a surfaced pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Deep liquidity and large expected profit.
    #[strum(serialize = "high")]
    High,
    /// Worth surfacing, not worth auto-acting on.
    #[strum(serialize = "medium")]
    Medium,
    /// Shallow liquidity or marginal profit.
    #[strum(serialize = "low")]
    Low,
}

/// Candidate arbitrage: two markets on the same event priced far enough
/// apart that a profit can be locked in.
#[derive(Debug, Clone, Serialize)]
pub struct MarketPair {
    /// Lower-priced side.
    pub market1: Market,
    /// Higher-priced side.
    pub market2: Market,
    /// Expected profit after the execution-cost estimate.
    pub expected_profit: Decimal,
    /// Certainty label from profit magnitude and liquidity depth.
    pub confidence: Confidence,
    /// Why the pair was surfaced, including cluster flags.
    pub match_reason: Option<String>,
}

impl MarketPair {
    /// Content fingerprint used for notification dedup: identical pair
    /// content yields an identical fingerprint regardless of side order.
    pub fn fingerprint(&self) -> String {
        let mut ids = [self.market1.id.as_str(), self.market2.id.as_str()];
        ids.sort_unstable();
        format!("{}|{}", ids[0], ids[1])
    }
}

/// Expected profit for a probability gap at the given executable depth.
/// Monotonically increasing in the gap, decreasing in the cost estimate.
pub fn expected_profit(
    p1: Decimal,
    p2: Decimal,
    depth: Decimal,
    execution_cost_rate: Decimal,
) -> Decimal {
    let gap = (p1 - p2).abs();
    gap * depth * (Decimal::ONE - execution_cost_rate)
}

/// Score every unordered pair of distinct markets in a cluster.
///
/// Pairs below the profit floor are dropped. A stored rejected label on a
/// textually similar pair suppresses it unless the profit clears the
/// override threshold. Missing liquidity counts as zero depth, which floors
/// profit and excludes illiquid pairs.
#[instrument(skip(cluster, feedback, config), fields(cluster = %cluster.cluster_id))]
pub fn score_cluster(
    cluster: &ClusterResult,
    feedback: &dyn FeedbackStore,
    config: &Config,
) -> Vec<MarketPair> {
    let mut pairs = Vec::new();
    let override_floor = config.min_profit_floor * config.feedback_override_multiplier;

    for i in 0..cluster.markets.len() {
        for j in (i + 1)..cluster.markets.len() {
            let a = &cluster.markets[i];
            let b = &cluster.markets[j];

            let depth = a.liquidity_or_zero().min(b.liquidity_or_zero());
            let profit = expected_profit(
                a.probability,
                b.probability,
                depth,
                config.execution_cost_rate,
            );

            if profit < config.min_profit_floor {
                continue;
            }

            if let Some(label) = feedback.find_similar(
                &a.question,
                &b.question,
                config.feedback_similarity_threshold,
            ) {
                if !label.is_valid_opportunity && profit < override_floor {
                    debug!(
                        market1 = %a.id,
                        market2 = %b.id,
                        profit = %profit,
                        "Pair suppressed by rejected feedback label"
                    );
                    crate::metrics::inc_pairs_suppressed();
                    continue;
                }
            }

            let (market1, market2) = if a.probability <= b.probability {
                (a.clone(), b.clone())
            } else {
                (b.clone(), a.clone())
            };

            let confidence = confidence_label(profit, depth, config);
            let match_reason = Some(if cluster.is_low_confidence() {
                format!(
                    "same event '{}' (low cluster confidence {:.2})",
                    cluster.canonical_event, cluster.confidence
                )
            } else {
                format!("same event '{}'", cluster.canonical_event)
            });

            pairs.push(MarketPair {
                market1,
                market2,
                expected_profit: profit,
                confidence,
                match_reason,
            });
        }
    }

    pairs
}

/// Label from profit magnitude and liquidity depth. Feedback alone never
/// raises a label.
fn confidence_label(profit: Decimal, depth: Decimal, config: &Config) -> Confidence {
    if profit >= config.high_profit_floor && depth >= config.deep_liquidity_floor {
        Confidence::High
    } else if depth < config.shallow_liquidity_floor {
        Confidence::Low
    } else {
        Confidence::Medium
    }
}
