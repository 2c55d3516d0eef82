use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, patch, post};
use axum::Router;
use services::{AuthService, ComplaintService};
use tokio::sync::watch;

use crate::handlers::{auth, complaints, dashboard, health};
use crate::middleware;
use crate::session::{maintenance_only, require_session};

/// Request bodies carry base64 attachments, so the cap sits above axum's 2 MiB default.
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub complaints: Arc<ComplaintService>,
    pub auth: Arc<AuthService>,
    pub max_body_bytes: usize,
    /// Flips to `true` when the server is stopping; live streams end on it.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(complaints: Arc<ComplaintService>, auth: Arc<AuthService>) -> Self {
        // The sender is dropped at once, so streams only end with their client.
        let (_, shutdown) = watch::channel(false);
        Self { complaints, auth, max_body_bytes: DEFAULT_MAX_BODY_BYTES, shutdown }
    }

    /// Ends every open event stream once `true` is sent on the channel, so
    /// graceful shutdown does not wait on subscribers.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let maintenance = Router::new()
        .route("/api/complaints/{id}/status", patch(complaints::update_status))
        .route("/api/dashboard", get(dashboard::snapshot))
        .route("/api/dashboard/stream", get(dashboard::stream))
        .route_layer(from_fn(maintenance_only));

    let signed_in = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/complaints", post(complaints::submit).get(complaints::mine))
        .route("/api/complaints/stream", get(complaints::mine_stream))
        .route("/api/complaints/{id}", get(complaints::detail))
        .merge(maintenance)
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let (set_request_id, propagate_request_id) = middleware::request_id_layers();

    Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .merge(signed_in)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(middleware::cors_policy())
        .layer(propagate_request_id)
        .layer(middleware::trace_layer())
        .layer(set_request_id)
        .with_state(state)
}
