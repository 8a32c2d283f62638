//! Carrier-facing webhooks: the voice webhook answering with a
//! call-control document, and a minimal Asterisk AGI endpoint.

use axum::extract::Form;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;

/// Form fields the carrier posts on an inbound call.
#[derive(Debug, Deserialize)]
pub struct VoiceWebhookParams {
    #[serde(rename = "CallSid", default)]
    pub call_sid: String,
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: String,
}

/// `POST /twilio/voice` — answers with a TwiML document directing the
/// carrier to open the media-stream socket, passing the call identifier and
/// caller address as stream parameters.
pub async fn voice_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Form(params): Form<VoiceWebhookParams>,
) -> impl IntoResponse {
    tracing::info!(
        call_sid = %params.call_sid,
        from = %params.from,
        to = %params.to,
        "incoming carrier call"
    );

    let stream_url = stream_url(state.public_url.as_deref(), &headers);
    tracing::debug!(%stream_url, "answering with media-stream TwiML");

    let twiml = render_twiml(&stream_url, &params.call_sid, &params.from);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        twiml,
    )
}

/// Derives the WebSocket URL the carrier should connect to.
///
/// Behind a tunnel or proxy the original scheme arrives in
/// `X-Forwarded-Proto`; otherwise the request is assumed plain HTTP.
fn stream_url(public_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = public_url {
        let base = base.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        return format!("{ws_base}/twilio/media-stream");
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");
    let ws_proto = if proto == "https" { "wss" } else { "ws" };
    format!("{ws_proto}://{host}/twilio/media-stream")
}

/// Renders the call-control document. Values land in XML attributes, so
/// they are escaped.
fn render_twiml(stream_url: &str, call_sid: &str, from: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Connect>
        <Stream url="{}">
            <Parameter name="callSid" value="{}" />
            <Parameter name="from" value="{}" />
        </Stream>
    </Connect>
</Response>"#,
        xml_escape(stream_url),
        xml_escape(call_sid),
        xml_escape(from)
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// AGI command sequence returned to Asterisk.
const AGI_COMMANDS: &str = "ANSWER\nVERBOSE \"Call received\" 1\nSTREAM FILE welcome \"\"\nHANGUP\n";

/// `/agi` (any method) — minimal Asterisk AGI integration: reads the
/// `agi_*` environment the PBX sends, answers with a fixed command
/// sequence.
pub async fn agi_handler(body: String) -> impl IntoResponse {
    let caller = body
        .lines()
        .find_map(|line| line.strip_prefix("agi_callerid:"))
        .map(str::trim)
        .unwrap_or("unknown");
    tracing::info!(%caller, "asterisk AGI request");

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        AGI_COMMANDS,
    )
}
