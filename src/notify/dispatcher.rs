//! Notification storage, dedup and delivery.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::StoreError;
use crate::metrics;

use super::email::EmailSink;

/// Notification category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A high-confidence arbitrage pair was found.
    #[strum(serialize = "opportunity_found")]
    OpportunityFound,
    /// A scan finished (successfully or not).
    #[strum(serialize = "scan_complete")]
    ScanComplete,
    /// A watchlist entry crossed its drift threshold.
    #[strum(serialize = "watchlist_alert")]
    WatchlistAlert,
    /// Anything else.
    #[strum(serialize = "other")]
    Other,
}

/// A stored notification. Mutated only by read-state transitions, never
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Record identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Category.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Human-readable message.
    pub message: String,
    /// Structured payload for the UI.
    pub data: serde_json::Value,
    /// Read flag. The unread count is always derived from this, never
    /// stored separately.
    pub is_read: bool,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A notification about to be created.
#[derive(Debug, Clone)]
pub struct NewNotification {
    /// Category.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Human-readable message.
    pub message: String,
    /// Structured payload.
    pub data: serde_json::Value,
    /// Content fingerprint for dedup. Creations sharing a fingerprint
    /// within the dedup window are dropped.
    pub fingerprint: Option<String>,
}

/// Stores scan-derived notifications, deduplicates them, tracks read state
/// and optionally forwards to an email sink.
pub struct NotificationDispatcher {
    notifications: DashMap<String, Notification>,
    recent_fingerprints: DashMap<(String, String), OffsetDateTime>,
    dedup_window: time::Duration,
    email: Option<Arc<dyn EmailSink>>,
    email_to: Option<String>,
}

impl NotificationDispatcher {
    /// Create a dispatcher without email forwarding.
    pub fn new(config: &Config) -> Self {
        Self {
            notifications: DashMap::new(),
            recent_fingerprints: DashMap::new(),
            dedup_window: time::Duration::seconds(config.notification_dedup_window_secs as i64),
            email: None,
            email_to: None,
        }
    }

    /// Enable best-effort email forwarding.
    pub fn with_email(mut self, sink: Arc<dyn EmailSink>, to: impl Into<String>) -> Self {
        self.email = Some(sink);
        self.email_to = Some(to.into());
        self
    }

    /// Store a notification, unless its fingerprint was already seen within
    /// the dedup window. Returns the stored record, or `None` when deduped.
    ///
    /// Email forwarding is a side effect with its own failure domain: a
    /// send failure is logged and counted, the stored record stands.
    pub async fn create(&self, user_id: &str, new: NewNotification) -> Option<Notification> {
        if let Some(ref fingerprint) = new.fingerprint {
            let key = (user_id.to_string(), fingerprint.clone());
            let now = OffsetDateTime::now_utc();

            // Expired keys are dead weight; sweep them so the map stays
            // bounded by the number of fingerprints seen in one window.
            self.recent_fingerprints
                .retain(|_, seen| now - *seen < self.dedup_window);

            let seen_recently = self
                .recent_fingerprints
                .get(&key)
                .map(|seen| now - *seen < self.dedup_window)
                .unwrap_or(false);
            if seen_recently {
                debug!(fingerprint = %fingerprint, "Notification deduplicated");
                metrics::inc_notifications_deduped();
                return None;
            }
            self.recent_fingerprints.insert(key, now);
        }

        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind: new.kind,
            title: new.title,
            message: new.message,
            data: new.data,
            is_read: false,
            created_at: OffsetDateTime::now_utc(),
        };

        self.notifications
            .insert(notification.id.clone(), notification.clone());
        metrics::inc_notifications_created();

        if let (Some(sink), Some(to)) = (&self.email, &self.email_to) {
            match sink
                .send_email(to, &notification.title, &notification.message)
                .await
            {
                Ok(()) => metrics::inc_emails_sent(),
                Err(e) => {
                    warn!(sink = sink.name(), error = %e, "Email forwarding failed");
                    metrics::inc_emails_failed();
                }
            }
        }

        Some(notification)
    }

    /// Notifications for a user, newest first.
    pub fn list(&self, user_id: &str) -> Vec<Notification> {
        let mut result: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.value().clone())
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result
    }

    /// Mark one notification read. Idempotent: marking an already-read
    /// notification is a no-op, not an error.
    pub fn mark_read(&self, id: &str) -> Result<(), StoreError> {
        match self.notifications.get_mut(id) {
            Some(mut entry) => {
                entry.is_read = true;
                Ok(())
            }
            None => Err(StoreError::NotFound { id: id.to_string() }),
        }
    }

    /// Mark all of a user's notifications read.
    pub fn mark_all_read(&self, user_id: &str) {
        for mut entry in self.notifications.iter_mut() {
            if entry.user_id == user_id {
                entry.is_read = true;
            }
        }
    }

    /// Derived unread count.
    pub fn unread_count(&self, user_id: &str) -> usize {
        self.notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::email::MockEmailSink;
    use pretty_assertions::assert_eq;

    fn new_notification(fingerprint: Option<&str>) -> NewNotification {
        NewNotification {
            kind: NotificationKind::OpportunityFound,
            title: "Arbitrage opportunity".to_string(),
            message: "two markets diverged".to_string(),
            data: serde_json::json!({}),
            fingerprint: fingerprint.map(|f| f.to_string()),
        }
    }

    #[tokio::test]
    async fn create_and_list() {
        let dispatcher = NotificationDispatcher::new(&Config::default());

        dispatcher.create("u1", new_notification(None)).await.unwrap();
        dispatcher.create("u1", new_notification(None)).await.unwrap();
        dispatcher.create("u2", new_notification(None)).await.unwrap();

        assert_eq!(dispatcher.list("u1").len(), 2);
        assert_eq!(dispatcher.list("u2").len(), 1);
        assert_eq!(dispatcher.unread_count("u1"), 2);
    }

    #[tokio::test]
    async fn duplicate_fingerprint_within_window_is_dropped() {
        let dispatcher = NotificationDispatcher::new(&Config::default());

        let first = dispatcher.create("u1", new_notification(Some("a|b"))).await;
        let second = dispatcher.create("u1", new_notification(Some("a|b"))).await;

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(dispatcher.list("u1").len(), 1);
    }

    #[tokio::test]
    async fn expired_fingerprints_are_swept_and_stop_deduping() {
        let config = Config {
            notification_dedup_window_secs: 0,
            ..Config::default()
        };
        let dispatcher = NotificationDispatcher::new(&config);

        // With a zero-length window every fingerprint expires immediately,
        // so the repeat is stored instead of suppressed.
        let first = dispatcher.create("u1", new_notification(Some("a|b"))).await;
        let second = dispatcher.create("u1", new_notification(Some("a|b"))).await;

        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(dispatcher.list("u1").len(), 2);
    }

    #[tokio::test]
    async fn different_users_do_not_share_dedup() {
        let dispatcher = NotificationDispatcher::new(&Config::default());

        assert!(dispatcher.create("u1", new_notification(Some("a|b"))).await.is_some());
        assert!(dispatcher.create("u2", new_notification(Some("a|b"))).await.is_some());
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let dispatcher = NotificationDispatcher::new(&Config::default());
        let n = dispatcher.create("u1", new_notification(None)).await.unwrap();

        dispatcher.mark_read(&n.id).unwrap();
        dispatcher.mark_read(&n.id).unwrap();

        assert_eq!(dispatcher.unread_count("u1"), 0);
    }

    #[tokio::test]
    async fn mark_read_unknown_id_is_not_found() {
        let dispatcher = NotificationDispatcher::new(&Config::default());
        assert!(matches!(
            dispatcher.mark_read("missing"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn mark_all_read_clears_unread() {
        let dispatcher = NotificationDispatcher::new(&Config::default());
        dispatcher.create("u1", new_notification(None)).await.unwrap();
        dispatcher.create("u1", new_notification(None)).await.unwrap();

        dispatcher.mark_all_read("u1");
        assert_eq!(dispatcher.unread_count("u1"), 0);
    }

    #[tokio::test]
    async fn email_failure_keeps_notification() {
        let dispatcher = NotificationDispatcher::new(&Config::default())
            .with_email(Arc::new(MockEmailSink::failing()), "a@example.com");

        let stored = dispatcher.create("u1", new_notification(None)).await;
        assert!(stored.is_some());
        assert_eq!(dispatcher.list("u1").len(), 1);
    }

    #[tokio::test]
    async fn email_forwarding_sends() {
        let sink = MockEmailSink::new();
        let dispatcher = NotificationDispatcher::new(&Config::default())
            .with_email(Arc::new(sink.clone()), "a@example.com");

        dispatcher.create("u1", new_notification(None)).await.unwrap();
        assert_eq!(sink.sent().len(), 1);
    }
}
