//! Prometheus metrics for the scan pipeline and trade execution.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Scan latency metric name.
pub const METRIC_SCAN_LATENCY: &str = "scan_latency_ms";
/// Scans started counter metric name.
pub const METRIC_SCANS_STARTED: &str = "scans_started_total";
/// Scans completed counter metric name.
pub const METRIC_SCANS_COMPLETED: &str = "scans_completed_total";
/// Scans failed counter metric name.
pub const METRIC_SCANS_FAILED: &str = "scans_failed_total";
/// Opportunities found counter metric name.
pub const METRIC_OPPORTUNITIES_FOUND: &str = "opportunities_found_total";
/// Feedback-suppressed pairs counter metric name.
pub const METRIC_PAIRS_SUPPRESSED: &str = "pairs_suppressed_total";
/// Notifications created counter metric name.
pub const METRIC_NOTIFICATIONS_CREATED: &str = "notifications_created_total";
/// Notifications deduplicated counter metric name.
pub const METRIC_NOTIFICATIONS_DEDUPED: &str = "notifications_deduped_total";
/// Emails forwarded counter metric name.
pub const METRIC_EMAILS_SENT: &str = "emails_sent_total";
/// Email failures counter metric name.
pub const METRIC_EMAILS_FAILED: &str = "emails_failed_total";
/// Watchlist additions counter metric name.
pub const METRIC_WATCHLIST_ADDS: &str = "watchlist_adds_total";
/// Watchlist alerts counter metric name.
pub const METRIC_WATCHLIST_ALERTS: &str = "watchlist_alerts_total";
/// Trades placed counter metric name.
pub const METRIC_TRADES_PLACED: &str = "trades_placed_total";
/// Trade failures counter metric name.
pub const METRIC_TRADES_FAILED: &str = "trades_failed_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(METRIC_SCAN_LATENCY, "End-to-end scan latency in milliseconds");

    describe_counter!(METRIC_SCANS_STARTED, "Total number of scans started");
    describe_counter!(METRIC_SCANS_COMPLETED, "Total number of scans completed");
    describe_counter!(METRIC_SCANS_FAILED, "Total number of scans failed");
    describe_counter!(
        METRIC_OPPORTUNITIES_FOUND,
        "Total number of arbitrage pairs surfaced"
    );
    describe_counter!(
        METRIC_PAIRS_SUPPRESSED,
        "Total number of pairs suppressed by rejected feedback"
    );
    describe_counter!(
        METRIC_NOTIFICATIONS_CREATED,
        "Total number of notifications stored"
    );
    describe_counter!(
        METRIC_NOTIFICATIONS_DEDUPED,
        "Total number of notifications dropped as duplicates"
    );
    describe_counter!(METRIC_EMAILS_SENT, "Total number of notification emails sent");
    describe_counter!(
        METRIC_EMAILS_FAILED,
        "Total number of notification emails that failed to send"
    );
    describe_counter!(METRIC_WATCHLIST_ADDS, "Total number of watchlist additions");
    describe_counter!(
        METRIC_WATCHLIST_ALERTS,
        "Total number of watchlist drift alerts fired"
    );
    describe_counter!(METRIC_TRADES_PLACED, "Total number of trades placed");
    describe_counter!(METRIC_TRADES_FAILED, "Total number of trade placements that failed");

    debug!("Metrics initialized");
}

/// Record end-to-end scan latency.
pub fn record_scan_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_SCAN_LATENCY).record(latency_ms);
}

/// Increment the scans-started counter.
pub fn inc_scans_started() {
    counter!(METRIC_SCANS_STARTED).increment(1);
}

/// Increment the scans-completed counter.
pub fn inc_scans_completed() {
    counter!(METRIC_SCANS_COMPLETED).increment(1);
}

/// Increment the scans-failed counter.
pub fn inc_scans_failed() {
    counter!(METRIC_SCANS_FAILED).increment(1);
}

/// Add a scan's surfaced pairs to the opportunities counter.
pub fn record_opportunities_found(count: usize) {
    counter!(METRIC_OPPORTUNITIES_FOUND).increment(count as u64);
}

/// Increment the feedback-suppressed pairs counter.
pub fn inc_pairs_suppressed() {
    counter!(METRIC_PAIRS_SUPPRESSED).increment(1);
}

/// Increment the notifications-created counter.
pub fn inc_notifications_created() {
    counter!(METRIC_NOTIFICATIONS_CREATED).increment(1);
}

/// Increment the notifications-deduplicated counter.
pub fn inc_notifications_deduped() {
    counter!(METRIC_NOTIFICATIONS_DEDUPED).increment(1);
}

/// Increment the emails-sent counter.
pub fn inc_emails_sent() {
    counter!(METRIC_EMAILS_SENT).increment(1);
}

/// Increment the emails-failed counter.
pub fn inc_emails_failed() {
    counter!(METRIC_EMAILS_FAILED).increment(1);
}

/// Increment the watchlist-additions counter.
pub fn inc_watchlist_adds() {
    counter!(METRIC_WATCHLIST_ADDS).increment(1);
}

/// Increment the watchlist-alerts counter.
pub fn inc_watchlist_alerts() {
    counter!(METRIC_WATCHLIST_ALERTS).increment(1);
}

/// Increment the trades-placed counter.
pub fn inc_trades_placed() {
    counter!(METRIC_TRADES_PLACED).increment(1);
}

/// Increment the trades-failed counter.
pub fn inc_trades_failed() {
    counter!(METRIC_TRADES_FAILED).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_are_callable_without_a_recorder() {
        // With no recorder installed these are no-ops; they must not panic.
        init_metrics();
        inc_scans_started();
        inc_scans_completed();
        inc_scans_failed();
        record_opportunities_found(3);
        inc_pairs_suppressed();
        inc_notifications_created();
        inc_notifications_deduped();
        inc_watchlist_alerts();
        inc_trades_placed();
        record_scan_latency(Instant::now());
    }
}
