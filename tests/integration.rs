//! End-to-end tests over the scan, notification, watchlist and trade
//! pipelines, driven entirely through mock collaborators.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use arbscan::config::Config;
use arbscan::market::{Market, MockMarketSource, OutcomeType};
use arbscan::notify::{NotificationDispatcher, NotificationKind};
use arbscan::scan::{InMemoryScanStore, ScanOrchestrator, ScanStatus, ScanStore};
use arbscan::scoring::{FeedbackExample, FeedbackStore, InMemoryFeedbackStore};
use arbscan::trade::{ApiCredential, MockTradeClient, TradeExecutor, TradeTarget};
use arbscan::watchlist::{AlertState, WatchlistTracker};

fn market(id: &str, question: &str, probability: Decimal, liquidity: Decimal) -> Market {
    Market {
        id: id.to_string(),
        question: question.to_string(),
        probability,
        liquidity: Some(liquidity),
        volume: None,
        outcome_type: OutcomeType::Binary,
        group_tags: vec!["election".to_string()],
        url: None,
    }
}

struct Harness {
    source: MockMarketSource,
    feedback: Arc<InMemoryFeedbackStore>,
    scans: Arc<InMemoryScanStore>,
    dispatcher: Arc<NotificationDispatcher>,
    watchlist: Arc<WatchlistTracker>,
    orchestrator: ScanOrchestrator,
    config: Config,
}

fn harness(markets: Vec<Market>) -> Harness {
    let config = Config::default();
    let source = MockMarketSource::with_markets(markets);
    let feedback = Arc::new(InMemoryFeedbackStore::new());
    let scans = Arc::new(InMemoryScanStore::new());
    let dispatcher = Arc::new(NotificationDispatcher::new(&config));
    let watchlist = Arc::new(WatchlistTracker::new());

    let orchestrator = ScanOrchestrator::new(
        Arc::new(source.clone()),
        Arc::clone(&feedback) as Arc<dyn FeedbackStore>,
        Arc::clone(&scans) as Arc<dyn ScanStore>,
        Arc::clone(&dispatcher),
        config.clone(),
    )
    .with_watchlist(Arc::clone(&watchlist));

    Harness {
        source,
        feedback,
        scans,
        dispatcher,
        watchlist,
        orchestrator,
        config,
    }
}

fn opportunity_count(dispatcher: &NotificationDispatcher, user: &str) -> usize {
    dispatcher
        .list(user)
        .iter()
        .filter(|n| n.kind == NotificationKind::OpportunityFound)
        .count()
}

#[tokio::test]
async fn two_market_scan_end_to_end() {
    let h = harness(vec![
        market("a", "Will Smith win the 2024 election?", dec!(0.40), dec!(500)),
        market("b", "Smith wins 2024 election?", dec!(0.55), dec!(500)),
    ]);

    let report = h.orchestrator.run_scan("u1").await.unwrap();

    assert_eq!(report.run.status, ScanStatus::Completed);
    assert_eq!(report.run.markets_scanned, 2);
    assert_eq!(report.run.opportunities_found, 1);
    assert_eq!(report.run.high_confidence_count, 1);

    // 0.15 gap * 500 depth * 0.98 after costs.
    assert_eq!(report.pairs[0].expected_profit, dec!(73.5));
    assert_eq!(report.pairs[0].market1.id, "a");

    // The run record is queryable afterwards.
    let stored = h.scans.get_run(&report.run.id).unwrap();
    assert_eq!(stored.opportunities_found, 1);

    // Exactly one opportunity notification plus the scan summary.
    assert_eq!(opportunity_count(&h.dispatcher, "u1"), 1);
    let summary_count = h
        .dispatcher
        .list("u1")
        .iter()
        .filter(|n| n.kind == NotificationKind::ScanComplete)
        .count();
    assert_eq!(summary_count, 1);
}

#[tokio::test]
async fn repeat_scans_suppress_duplicate_opportunity_alerts() {
    let h = harness(vec![
        market("a", "Will Smith win the 2024 election?", dec!(0.40), dec!(500)),
        market("b", "Smith wins 2024 election?", dec!(0.55), dec!(500)),
    ]);

    h.orchestrator.run_scan("u1").await.unwrap();
    h.orchestrator.run_scan("u1").await.unwrap();

    // Both scans completed and were recorded...
    assert_eq!(h.scans.list_runs().len(), 2);
    // ...but the unchanged pair alerted only once.
    assert_eq!(opportunity_count(&h.dispatcher, "u1"), 1);
}

#[tokio::test]
async fn rejected_feedback_quiets_future_scans() {
    let h = harness(vec![
        market("a", "Will Smith win the 2024 election?", dec!(0.48), dec!(100)),
        market("b", "Smith wins 2024 election?", dec!(0.52), dec!(100)),
    ]);

    let before = h.orchestrator.run_scan("u1").await.unwrap();
    assert_eq!(before.run.opportunities_found, 1);

    h.feedback.record(FeedbackExample::new(
        "Will Smith win the 2024 election?",
        "Smith wins 2024 election?",
        false,
        Some("different runoff rules".to_string()),
    ));

    let after = h.orchestrator.run_scan("u1").await.unwrap();
    assert_eq!(after.run.opportunities_found, 0);
}

#[tokio::test]
async fn unrelated_markets_produce_no_opportunities() {
    let mut btc = market("b", "Will bitcoin reach 100k by december?", dec!(0.70), dec!(500));
    btc.group_tags = vec!["crypto".to_string()];
    let h = harness(vec![
        market("a", "Will Smith win the 2024 election?", dec!(0.40), dec!(500)),
        btc,
    ]);

    let report = h.orchestrator.run_scan("u1").await.unwrap();

    assert_eq!(report.run.markets_scanned, 2);
    assert_eq!(report.run.opportunities_found, 0);
}

#[tokio::test]
async fn watchlist_alert_rearms_only_inside_band() {
    let h = harness(vec![market(
        "a",
        "Will Smith win the 2024 election?",
        dec!(0.50),
        dec!(500),
    )]);
    h.watchlist
        .add(
            "u1",
            &market("a", "Will Smith win the 2024 election?", dec!(0.50), dec!(500)),
            None,
            &h.config,
        )
        .unwrap();

    let alert_count = |d: &NotificationDispatcher| {
        d.list("u1")
            .iter()
            .filter(|n| n.kind == NotificationKind::WatchlistAlert)
            .count()
    };
    let set_probability = |p: Decimal| {
        h.source.set_markets(vec![market(
            "a",
            "Will Smith win the 2024 election?",
            p,
            dec!(500),
        )]);
    };

    // Crosses the 0.10 threshold: one alert.
    set_probability(dec!(0.61));
    h.orchestrator.run_scan("u1").await.unwrap();
    assert_eq!(alert_count(&h.dispatcher), 1);

    // Still outside the band on the same side: no repeat.
    set_probability(dec!(0.63));
    h.orchestrator.run_scan("u1").await.unwrap();
    assert_eq!(alert_count(&h.dispatcher), 1);

    // Back inside the band: re-arms silently.
    set_probability(dec!(0.55));
    h.orchestrator.run_scan("u1").await.unwrap();
    assert_eq!(alert_count(&h.dispatcher), 1);
    assert_eq!(h.watchlist.list("u1")[0].alert_state, AlertState::Armed);

    // Crosses again: second alert.
    set_probability(dec!(0.62));
    h.orchestrator.run_scan("u1").await.unwrap();
    assert_eq!(alert_count(&h.dispatcher), 2);
}

#[tokio::test]
async fn watchlist_rejects_duplicates_per_user() {
    let tracker = WatchlistTracker::new();
    let config = Config::default();
    let m = market("a", "Will Smith win the 2024 election?", dec!(0.50), dec!(500));

    assert!(tracker.add("u1", &m, None, &config).is_ok());
    assert!(tracker.add("u1", &m, None, &config).is_err());
    assert!(tracker.add("u2", &m, None, &config).is_ok());
}

#[tokio::test]
async fn trade_batch_continues_past_failures() {
    let venue = MockTradeClient::with_balance(dec!(1000))
        .failing_market("m2")
        .failing_market("m4");
    let executor = TradeExecutor::new(Arc::new(venue.clone()), Config::default());

    let targets: Vec<TradeTarget> = (1..=5)
        .map(|i| TradeTarget {
            market_id: format!("m{i}"),
            question: format!("Question about market m{i}"),
            allocation_percent: dec!(20),
        })
        .collect();

    let result = executor
        .execute(&ApiCredential::new("k"), dec!(100), &targets)
        .await
        .unwrap();

    assert_eq!(result.requested_count, 5);
    assert_eq!(result.trades_executed, 3);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors[0].contains("Question about market m2"));
    assert!(result.errors[1].contains("Question about market m4"));

    // Failed placements were not retried.
    let placed = venue.placed();
    assert_eq!(placed.len(), 3);
    assert!(placed.iter().all(|(id, _)| id != "m2" && id != "m4"));
}
