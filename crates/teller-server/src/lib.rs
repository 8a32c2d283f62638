//! Teller server library logic.
//!
//! Routes, per-call media-relay sessions, and the tool dispatcher. The
//! binary entry point lives in `main.rs`; everything here is reachable from
//! integration tests through [`app`].

pub mod api_session;
pub mod api_summary;
pub mod api_telephony;
pub mod api_webhook;
pub mod bridge;
pub mod config;
pub mod dispatcher;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get, post},
    Extension, Router,
};
use std::sync::Arc;
use teller_activation::ActivationClient;
use teller_agent::{SessionClient, SummaryClient};
use teller_store::CallStore;
use tower_http::cors::{Any, CorsLayer};

/// Maximum request body size (1 MiB). Webhook and summary payloads are
/// small; anything larger is rejected before it can exhaust memory.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Application state shared across all request handlers.
pub struct AppState {
    /// Negotiates ephemeral agent sessions and accepts inbound calls.
    pub session_client: SessionClient,
    /// Generates post-call summaries.
    pub summary_client: SummaryClient,
    /// Calls the bank's card activation backend.
    pub activation: ActivationClient,
    /// Per-call metadata persistence.
    pub store: CallStore,
    /// Active relay sessions, keyed by carrier stream identifier.
    pub registry: bridge::SessionRegistry,
    /// Public base URL used when building the media-stream address.
    pub public_url: Option<String>,
}

/// Health check handler.
///
/// Returns `200 OK` with a plain `ok`. Used by load balancers, monitoring,
/// and CI to verify the server is running.
async fn health() -> &'static str {
    "ok"
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/session", post(api_session::create_session_handler))
        .route(
            "/api/generate-summary",
            post(api_summary::generate_summary_handler),
        )
        .route("/webhook", post(api_webhook::webhook_handler))
        .route("/twilio/voice", post(api_telephony::voice_webhook_handler))
        .route("/agi", any(api_telephony::agi_handler))
        .route("/twilio/media-stream", get(bridge::media_stream_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
