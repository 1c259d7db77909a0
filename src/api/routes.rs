//! HTTP API route definitions.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    health, list_notifications, list_scans, list_watchlist, mark_all_notifications_read,
    mark_notification_read, ready, status, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Status and records
        .route("/api/v1/status", get(status))
        .route("/api/v1/scans", get(list_scans))
        .route("/api/v1/notifications", get(list_notifications))
        .route("/api/v1/notifications/:id/read", post(mark_notification_read))
        .route("/api/v1/notifications/read-all", post(mark_all_notifications_read))
        .route("/api/v1/watchlist", get(list_watchlist))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::notify::{NewNotification, NotificationDispatcher, NotificationKind};
    use crate::scan::InMemoryScanStore;
    use crate::watchlist::WatchlistTracker;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(
            "u1",
            Arc::new(NotificationDispatcher::new(&Config::default())),
            Arc::new(WatchlistTracker::new()),
            Arc::new(InMemoryScanStore::new()),
        )
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = create_router(state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_503_when_not_ready() {
        let app = create_router(state());

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ready_endpoint_returns_200_when_ready() {
        let state = state();
        state.set_ready(true);
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cross_origin_requests_get_cors_headers() {
        let app = create_router(state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("Origin", "https://dashboard.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn mark_read_roundtrip() {
        let state = state();
        let stored = state
            .dispatcher
            .create(
                "u1",
                NewNotification {
                    kind: NotificationKind::Other,
                    title: "t".to_string(),
                    message: "m".to_string(),
                    data: serde_json::json!({}),
                    fingerprint: None,
                },
            )
            .await
            .unwrap();
        let app = create_router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/notifications/{}/read", stored.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.dispatcher.unread_count("u1"), 0);
    }

    #[tokio::test]
    async fn mark_read_unknown_id_is_404() {
        let app = create_router(state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/notifications/missing/read")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
