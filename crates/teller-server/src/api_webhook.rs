//! Inbound SIP call webhook from the agent platform.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use std::sync::Arc;
use teller_agent::{tool_catalog, AgentError, SessionSpec};

use crate::AppState;

/// The only event type this webhook acts on.
const INCOMING_CALL_EVENT: &str = "realtime.call.incoming";

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Option<WebhookCallData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookCallData {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub sip_headers: Vec<SipHeader>,
}

#[derive(Debug, Deserialize)]
pub struct SipHeader {
    pub name: String,
    pub value: String,
}

/// `POST /webhook` — accept decision for inbound SIP calls.
///
/// Must respond within the platform's webhook deadline. Non-incoming events
/// are acknowledged and ignored; a missing call identifier is a client
/// error. This path creates no local session, so there is nothing to clean
/// up on failure.
pub async fn webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(event): Json<WebhookEvent>,
) -> impl IntoResponse {
    if event.kind != INCOMING_CALL_EVENT {
        tracing::debug!(kind = %event.kind, "ignoring webhook event");
        return (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ignored" })),
        )
            .into_response();
    }

    let data = event.data.unwrap_or(WebhookCallData {
        call_id: None,
        sip_headers: Vec::new(),
    });
    let Some(call_id) = data.call_id.filter(|id| !id.is_empty()) else {
        tracing::error!("webhook event missing call_id");
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "missing_call_id" })),
        )
            .into_response();
    };

    let from = data
        .sip_headers
        .iter()
        .find(|h| h.name == "From")
        .map(|h| h.value.as_str())
        .unwrap_or("unknown");
    tracing::info!(%call_id, %from, "incoming call");

    // SIP-originated calls get the tool catalog only when configured; the
    // telephony-stream path always declares it.
    let config = state.session_client.config();
    let mut spec = SessionSpec::from_config(config);
    if config.webhook_tools {
        spec = spec.with_tools(tool_catalog());
    }

    match state.session_client.accept_call(&call_id, spec).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "accepted",
                "call_id": call_id
            })),
        )
            .into_response(),
        Err(AgentError::Upstream { status, body }) => {
            tracing::error!(%call_id, status, "call accept rejected upstream");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "call_accept_failed",
                    "detail": body
                })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(%call_id, "call accept failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "internal_server_error",
                    "detail": e.to_string()
                })),
            )
                .into_response()
        }
    }
}
