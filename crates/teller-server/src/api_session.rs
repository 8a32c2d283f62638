//! Session negotiation endpoint for the browser call path.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::sync::Arc;
use teller_agent::{AgentError, SessionSpec};

use crate::AppState;

/// `POST /api/session` — mints an ephemeral credential for a direct agent
/// connection, declaring the base session configuration (audio+text, server
/// VAD, pinned prompt).
///
/// Fails loudly rather than degrading: an upstream failure propagates its
/// status and body, and the call attempt is aborted by the client.
pub async fn create_session_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    let spec = SessionSpec::from_config(state.session_client.config());
    match state.session_client.create_session(&spec).await {
        Ok(session) => (
            StatusCode::OK,
            Json(serde_json::json!({ "client_secret": session.client_secret })),
        )
            .into_response(),
        Err(AgentError::Upstream { status, body }) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            Json(serde_json::json!({
                "error": "session_create_failed",
                "detail": body
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("session create error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "server_error",
                    "detail": e.to_string()
                })),
            )
                .into_response()
        }
    }
}
