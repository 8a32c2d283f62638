//! Post-call summary endpoint.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use std::sync::Arc;
use teller_agent::SummaryMessage;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub messages: Vec<SummaryMessage>,
}

/// `POST /api/generate-summary` — turns a finished call transcript into a
/// narrative English summary.
pub async fn generate_summary_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<SummaryRequest>,
) -> impl IntoResponse {
    if request.messages.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "no_messages" })),
        )
            .into_response();
    }

    match state.summary_client.summarize(&request.messages).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(serde_json::json!({ "summary": summary })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("summary generation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "summary_failed" })),
            )
                .into_response()
        }
    }
}
