//! Market snapshot types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How a market resolves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeType {
    /// Yes/no market.
    #[default]
    #[strum(serialize = "binary", serialize = "BINARY")]
    Binary,
    /// One of several named outcomes.
    #[strum(serialize = "categorical", serialize = "CATEGORICAL")]
    Categorical,
    /// Resolves to a numeric value.
    #[strum(serialize = "scalar", serialize = "SCALAR")]
    Scalar,
}

/// Immutable market snapshot fetched per scan. Not persisted beyond the
/// scan record that referenced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    /// Market identifier at the quote source.
    pub id: String,
    /// Free-text market question.
    pub question: String,
    /// Current implied probability, within [0, 1].
    pub probability: Decimal,
    /// Liquidity depth, if the source reports it.
    pub liquidity: Option<Decimal>,
    /// Traded volume, if the source reports it.
    pub volume: Option<Decimal>,
    /// Resolution type.
    pub outcome_type: OutcomeType,
    /// Source-assigned grouping tags.
    pub group_tags: Vec<String>,
    /// Public URL of the market, if known.
    pub url: Option<String>,
}

impl Market {
    /// Liquidity with the missing case resolved to zero, which floors
    /// expected profit and excludes illiquid pairs from scoring.
    pub fn liquidity_or_zero(&self) -> Decimal {
        self.liquidity.unwrap_or(Decimal::ZERO)
    }
}

/// Filter applied to a market fetch.
#[derive(Debug, Clone, Default)]
pub struct MarketFilter {
    /// Restrict to markets carrying this grouping tag.
    pub group_tag: Option<String>,
    /// Drop markets below this liquidity.
    pub min_liquidity: Option<Decimal>,
    /// Maximum markets to return.
    pub limit: Option<u32>,
}

impl MarketFilter {
    /// Check whether a market passes this filter.
    pub fn matches(&self, market: &Market) -> bool {
        if let Some(ref tag) = self.group_tag {
            if !market.group_tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        if let Some(min) = self.min_liquidity {
            if market.liquidity_or_zero() < min {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_market(liquidity: Option<Decimal>, tags: &[&str]) -> Market {
        Market {
            id: "m1".to_string(),
            question: "Will X win the 2024 election?".to_string(),
            probability: dec!(0.40),
            liquidity,
            volume: None,
            outcome_type: OutcomeType::Binary,
            group_tags: tags.iter().map(|t| t.to_string()).collect(),
            url: None,
        }
    }

    #[test]
    fn missing_liquidity_is_zero() {
        assert_eq!(test_market(None, &[]).liquidity_or_zero(), Decimal::ZERO);
        assert_eq!(
            test_market(Some(dec!(500)), &[]).liquidity_or_zero(),
            dec!(500)
        );
    }

    #[test]
    fn filter_by_tag_and_liquidity() {
        let market = test_market(Some(dec!(100)), &["election"]);

        let pass = MarketFilter {
            group_tag: Some("Election".to_string()),
            min_liquidity: Some(dec!(50)),
            limit: None,
        };
        assert!(pass.matches(&market));

        let wrong_tag = MarketFilter {
            group_tag: Some("sports".to_string()),
            ..Default::default()
        };
        assert!(!wrong_tag.matches(&market));

        let too_shallow = MarketFilter {
            min_liquidity: Some(dec!(200)),
            ..Default::default()
        };
        assert!(!too_shallow.matches(&market));
    }

    #[test]
    fn outcome_type_from_string() {
        use std::str::FromStr;
        assert_eq!(OutcomeType::from_str("binary").unwrap(), OutcomeType::Binary);
        assert_eq!(
            OutcomeType::from_str("CATEGORICAL").unwrap(),
            OutcomeType::Categorical
        );
    }
}
