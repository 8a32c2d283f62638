use thiserror::Error;

/// Errors from the agent platform client.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The HTTP request itself failed (connect, TLS, timeout).
    #[error("agent platform request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success status. The body is kept
    /// verbatim so callers can fail loudly with the upstream detail.
    #[error("agent platform returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The realtime WebSocket handshake or transport failed.
    #[error("agent connection failed: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The ephemeral credential could not be placed in a request header.
    #[error("ephemeral credential is not header-safe")]
    InvalidCredential,

    /// An outbound event could not be serialized.
    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
