//! HTTP API handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::StoreError;
use crate::notify::NotificationDispatcher;
use crate::scan::{ScanRun, ScanStore};
use crate::watchlist::WatchlistTracker;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Whether the engine finished startup and is scanning.
    pub ready: Arc<std::sync::atomic::AtomicBool>,
    /// User identity served by this instance.
    pub user_id: String,
    /// Notification storage.
    pub dispatcher: Arc<NotificationDispatcher>,
    /// Watchlist storage.
    pub watchlist: Arc<WatchlistTracker>,
    /// Scan-run records.
    pub scans: Arc<dyn ScanStore>,
}

impl AppState {
    /// Create app state over the engine's shared collaborators.
    pub fn new(
        user_id: impl Into<String>,
        dispatcher: Arc<NotificationDispatcher>,
        watchlist: Arc<WatchlistTracker>,
        scans: Arc<dyn ScanStore>,
    ) -> Self {
        Self {
            ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            user_id: user_id.into(),
            dispatcher,
            watchlist,
            scans,
        }
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready
            .store(ready, std::sync::atomic::Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the engine is ready.
    pub ready: bool,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Most recent scan run, if any.
    pub latest_scan: Option<ScanRun>,
    /// Unread notifications for the served user.
    pub unread_notifications: usize,
    /// Watched markets for the served user.
    pub watchlist_size: usize,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse { ready: is_ready };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - latest scan and per-user counts.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        latest_scan: state.scans.list_runs().into_iter().next(),
        unread_notifications: state.dispatcher.unread_count(&state.user_id),
        watchlist_size: state.watchlist.list(&state.user_id).len(),
    })
}

/// List the served user's notifications, newest first.
pub async fn list_notifications(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dispatcher.list(&state.user_id))
}

/// Mark one notification read.
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.dispatcher.mark_read(&id) {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Mark all of the served user's notifications read.
pub async fn mark_all_notifications_read(State(state): State<AppState>) -> impl IntoResponse {
    state.dispatcher.mark_all_read(&state.user_id);
    StatusCode::NO_CONTENT
}

/// List the served user's watchlist, newest first.
pub async fn list_watchlist(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.watchlist.list(&state.user_id))
}

/// List scan runs, newest first.
pub async fn list_scans(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scans.list_runs())
}
