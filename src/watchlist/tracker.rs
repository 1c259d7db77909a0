//! Per-user market watchlists with probability-drift alerts.

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::StoreError;
use crate::market::Market;
use crate::metrics;

/// Alert latch for one watchlist entry.
///
/// An armed entry fires once when drift crosses the threshold; it only
/// re-arms after the probability returns inside the band, or fires again
/// immediately if drift swings past the threshold in the other direction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// Ready to fire in either direction.
    #[strum(serialize = "armed")]
    Armed,
    /// Fired on upward drift; silent until re-armed or a downward cross.
    #[strum(serialize = "fired_above")]
    FiredAbove,
    /// Fired on downward drift; silent until re-armed or an upward cross.
    #[strum(serialize = "fired_below")]
    FiredBelow,
}

/// One tracked market on a user's watchlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    /// Record identifier.
    pub id: String,
    /// Tracked market.
    pub market_id: String,
    /// Question text at add time.
    pub market_question: String,
    /// Market URL, when the source provides one.
    pub market_url: Option<String>,
    /// Probability when the entry was added. Drift is measured against
    /// this, not the previous refresh.
    pub initial_probability: Decimal,
    /// Probability at the latest refresh.
    pub current_probability: Decimal,
    /// Liquidity at the latest refresh.
    pub liquidity: Option<Decimal>,
    /// When the entry was added.
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
    /// Free-text user notes.
    pub notes: Option<String>,
    /// Absolute drift that triggers an alert.
    pub alert_threshold: Decimal,
    /// Alert latch.
    pub alert_state: AlertState,
}

/// A threshold crossing detected during a refresh.
#[derive(Debug, Clone)]
pub struct WatchlistAlert {
    /// The entry after the refresh.
    pub entry: WatchlistEntry,
    /// Signed drift from the initial probability.
    pub drift: Decimal,
}

/// Tracks watched markets per user and evaluates drift alerts on refresh.
#[derive(Debug, Default)]
pub struct WatchlistTracker {
    entries: DashMap<(String, String), WatchlistEntry>,
}

impl WatchlistTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a market to a user's watchlist. At most one entry per
    /// (user, market); a second add is a recoverable duplicate error.
    pub fn add(
        &self,
        user_id: &str,
        market: &Market,
        notes: Option<String>,
        config: &Config,
    ) -> Result<WatchlistEntry, StoreError> {
        let key = (user_id.to_string(), market.id.clone());
        if self.entries.contains_key(&key) {
            return Err(StoreError::DuplicateEntry {
                market_id: market.id.clone(),
            });
        }

        let entry = WatchlistEntry {
            id: Uuid::new_v4().to_string(),
            market_id: market.id.clone(),
            market_question: market.question.clone(),
            market_url: market.url.clone(),
            initial_probability: market.probability,
            current_probability: market.probability,
            liquidity: market.liquidity,
            added_at: OffsetDateTime::now_utc(),
            notes,
            alert_threshold: config.default_alert_threshold,
            alert_state: AlertState::Armed,
        };
        self.entries.insert(key, entry.clone());
        metrics::inc_watchlist_adds();
        Ok(entry)
    }

    /// Remove a market from a user's watchlist.
    pub fn remove(&self, user_id: &str, market_id: &str) -> Result<(), StoreError> {
        let key = (user_id.to_string(), market_id.to_string());
        match self.entries.remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                id: market_id.to_string(),
            }),
        }
    }

    /// Replace the notes on an entry.
    pub fn update_notes(
        &self,
        user_id: &str,
        market_id: &str,
        notes: Option<String>,
    ) -> Result<WatchlistEntry, StoreError> {
        let key = (user_id.to_string(), market_id.to_string());
        match self.entries.get_mut(&key) {
            Some(mut entry) => {
                entry.notes = notes;
                Ok(entry.clone())
            }
            None => Err(StoreError::NotFound {
                id: market_id.to_string(),
            }),
        }
    }

    /// Whether a user already watches a market.
    pub fn is_watched(&self, user_id: &str, market_id: &str) -> bool {
        self.entries
            .contains_key(&(user_id.to_string(), market_id.to_string()))
    }

    /// A user's entries, newest first.
    pub fn list(&self, user_id: &str) -> Vec<WatchlistEntry> {
        let mut entries: Vec<WatchlistEntry> = self
            .entries
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        entries
    }

    /// Fold fresh market snapshots into a user's entries and collect
    /// threshold crossings. Markets absent from the snapshot keep their
    /// last-seen values.
    #[instrument(skip(self, markets), fields(user = %user_id, markets = markets.len()))]
    pub fn refresh(&self, user_id: &str, markets: &[Market]) -> Vec<WatchlistAlert> {
        let mut alerts = Vec::new();

        for market in markets {
            let key = (user_id.to_string(), market.id.clone());
            let Some(mut entry) = self.entries.get_mut(&key) else {
                continue;
            };

            entry.current_probability = market.probability;
            entry.liquidity = market.liquidity;

            let drift = entry.current_probability - entry.initial_probability;
            let crossed = drift.abs() >= entry.alert_threshold;
            let direction = if drift >= Decimal::ZERO {
                AlertState::FiredAbove
            } else {
                AlertState::FiredBelow
            };

            if !crossed {
                if entry.alert_state != AlertState::Armed {
                    debug!(market = %entry.market_id, "Watchlist alert re-armed");
                    entry.alert_state = AlertState::Armed;
                }
                continue;
            }

            // Fire when armed, or when the drift flipped past the
            // threshold on the other side without re-arming in between.
            if entry.alert_state == AlertState::Armed || entry.alert_state != direction {
                entry.alert_state = direction;
                metrics::inc_watchlist_alerts();
                alerts.push(WatchlistAlert {
                    entry: entry.clone(),
                    drift,
                });
            }
        }

        alerts
    }
}
