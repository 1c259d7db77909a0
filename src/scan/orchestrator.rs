//! The scan pipeline: fetch, cluster, score, record, notify.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::cluster::cluster_markets;
use crate::config::Config;
use crate::error::ScanError;
use crate::market::{MarketFilter, MarketSource};
use crate::metrics;
use crate::notify::{NewNotification, NotificationDispatcher, NotificationKind};
use crate::scoring::{score_cluster, Confidence, FeedbackStore, MarketPair};
use crate::watchlist::WatchlistTracker;

use super::store::{ScanRun, ScanStore};

/// Outcome of one scan: the finalized run record and every surfaced pair.
#[derive(Debug)]
pub struct ScanReport {
    /// The terminal run record.
    pub run: ScanRun,
    /// Surfaced pairs, highest expected profit first.
    pub pairs: Vec<MarketPair>,
}

/// Drives the scan pipeline end to end. Clustering and scoring fan out
/// over a bounded worker pool; run-record counts are written by this
/// orchestrator alone, once, at finalization.
pub struct ScanOrchestrator {
    source: Arc<dyn MarketSource>,
    feedback: Arc<dyn FeedbackStore>,
    store: Arc<dyn ScanStore>,
    dispatcher: Arc<NotificationDispatcher>,
    watchlist: Option<Arc<WatchlistTracker>>,
    config: Config,
}

impl ScanOrchestrator {
    /// Wire up an orchestrator over the given collaborators.
    pub fn new(
        source: Arc<dyn MarketSource>,
        feedback: Arc<dyn FeedbackStore>,
        store: Arc<dyn ScanStore>,
        dispatcher: Arc<NotificationDispatcher>,
        config: Config,
    ) -> Self {
        Self {
            source,
            feedback,
            store,
            dispatcher,
            watchlist: None,
            config,
        }
    }

    /// Fold fetched markets into a watchlist on every scan, emitting
    /// drift alerts as notifications.
    pub fn with_watchlist(mut self, watchlist: Arc<WatchlistTracker>) -> Self {
        self.watchlist = Some(watchlist);
        self
    }

    /// Run one scan for the given user.
    ///
    /// A market-fetch failure marks the run `failed`, emits a failure
    /// notification and returns an error; every later stage only narrows
    /// the result set, so once markets are in hand the run completes.
    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn run_scan(&self, user_id: &str) -> Result<ScanReport, ScanError> {
        let run = self.store.create_run();
        let start = Instant::now();
        metrics::inc_scans_started();
        info!(scan_id = %run.id, "Scan started");

        let filter = MarketFilter {
            group_tag: None,
            min_liquidity: None,
            limit: Some(self.config.market_limit),
        };

        let markets = match self.source.fetch_markets(&filter).await {
            Ok(markets) => markets,
            Err(e) => {
                warn!(scan_id = %run.id, error = %e, "Market fetch failed, aborting scan");
                metrics::inc_scans_failed();
                let failed = self.store.fail_run(&run.id)?;
                let _ = self
                    .dispatcher
                    .create(
                        user_id,
                        NewNotification {
                            kind: NotificationKind::ScanComplete,
                            title: "Scan failed".to_string(),
                            message: format!("Market fetch failed: {e}"),
                            data: serde_json::json!({ "scanId": failed.id }),
                            fingerprint: None,
                        },
                    )
                    .await;
                return Err(ScanError::MarketFetch {
                    scan_id: failed.id,
                    reason: e.to_string(),
                });
            }
        };

        if let Some(watchlist) = &self.watchlist {
            for alert in watchlist.refresh(user_id, &markets) {
                let _ = self
                    .dispatcher
                    .create(
                        user_id,
                        NewNotification {
                            kind: NotificationKind::WatchlistAlert,
                            title: "Watchlist alert".to_string(),
                            message: format!(
                                "\"{}\" moved {} from {} to {}",
                                alert.entry.market_question,
                                alert.drift,
                                alert.entry.initial_probability,
                                alert.entry.current_probability
                            ),
                            data: serde_json::json!({
                                "marketId": alert.entry.market_id,
                                "drift": alert.drift,
                                "initialProbability": alert.entry.initial_probability,
                                "currentProbability": alert.entry.current_probability,
                            }),
                            fingerprint: None,
                        },
                    )
                    .await;
            }
        }

        let markets_scanned = markets.len();
        let clusters = cluster_markets(&markets, &self.config);
        info!(
            scan_id = %run.id,
            markets = markets_scanned,
            clusters = clusters.len(),
            "Markets clustered"
        );

        let feedback = Arc::clone(&self.feedback);
        let config = self.config.clone();
        let mut pairs: Vec<MarketPair> = stream::iter(clusters)
            .map(|cluster| {
                let feedback = Arc::clone(&feedback);
                let config = config.clone();
                async move { score_cluster(&cluster, feedback.as_ref(), &config) }
            })
            .buffer_unordered(self.config.scan_concurrency)
            .collect::<Vec<Vec<MarketPair>>>()
            .await
            .into_iter()
            .flatten()
            .collect();
        pairs.sort_by(|a, b| b.expected_profit.cmp(&a.expected_profit));

        let high_confidence_count = pairs
            .iter()
            .filter(|p| p.confidence == Confidence::High)
            .count();

        let finalized = self.store.complete_run(
            &run.id,
            markets_scanned,
            pairs.len(),
            high_confidence_count,
        )?;
        metrics::inc_scans_completed();
        metrics::record_scan_latency(start);
        metrics::record_opportunities_found(pairs.len());
        info!(
            scan_id = %finalized.id,
            markets = markets_scanned,
            opportunities = pairs.len(),
            high_confidence = high_confidence_count,
            "Scan completed"
        );

        self.notify(user_id, &finalized, &pairs).await;

        Ok(ScanReport {
            run: finalized,
            pairs,
        })
    }

    /// Emit the scan summary plus one notification per high-confidence
    /// pair, capped per scan. Capping happens before dedup so a scan
    /// never floods a user even when every fingerprint is fresh.
    async fn notify(&self, user_id: &str, run: &ScanRun, pairs: &[MarketPair]) {
        let _ = self
            .dispatcher
            .create(
                user_id,
                NewNotification {
                    kind: NotificationKind::ScanComplete,
                    title: "Scan complete".to_string(),
                    message: format!(
                        "Scanned {} markets, found {} opportunities ({} high confidence)",
                        run.markets_scanned, run.opportunities_found, run.high_confidence_count
                    ),
                    data: serde_json::json!({
                        "scanId": run.id,
                        "marketsScanned": run.markets_scanned,
                        "opportunitiesFound": run.opportunities_found,
                        "highConfidenceCount": run.high_confidence_count,
                    }),
                    fingerprint: None,
                },
            )
            .await;

        let high_confidence = pairs
            .iter()
            .filter(|p| p.confidence == Confidence::High)
            .take(self.config.opportunity_notification_cap);

        for pair in high_confidence {
            let _ = self
                .dispatcher
                .create(
                    user_id,
                    NewNotification {
                        kind: NotificationKind::OpportunityFound,
                        title: "Arbitrage opportunity".to_string(),
                        message: format!(
                            "${:.2} expected profit between \"{}\" and \"{}\"",
                            pair.expected_profit, pair.market1.question, pair.market2.question
                        ),
                        data: serde_json::json!({
                            "scanId": run.id,
                            "market1Id": pair.market1.id,
                            "market2Id": pair.market2.id,
                            "expectedProfit": pair.expected_profit,
                            "confidence": pair.confidence,
                        }),
                        fingerprint: Some(pair.fingerprint()),
                    },
                )
                .await;
        }
    }
}
