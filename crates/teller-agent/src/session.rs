//! Session negotiation: ephemeral credentials and inbound-call accepts.

use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;
use crate::error::AgentError;

/// Server-driven voice-activity turn detection settings.
#[derive(Debug, Clone, Serialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_padding_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<u32>,
}

impl TurnDetection {
    /// Base policy: server VAD with platform defaults. Used by the browser
    /// and webhook paths.
    pub fn server_vad() -> Self {
        Self {
            kind: "server_vad",
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
        }
    }

    /// Telephony tuning: the trailing-silence window is deliberately shorter
    /// than the platform default so the agent can be interrupted with less
    /// latency on a phone line.
    pub fn telephony() -> Self {
        Self {
            kind: "server_vad",
            threshold: Some(0.5),
            prefix_padding_ms: Some(300),
            silence_duration_ms: Some(200),
        }
    }
}

/// The prompt pinned to the deployed agent behavior.
#[derive(Debug, Clone, Serialize)]
pub struct PromptRef {
    pub id: String,
    pub version: String,
}

/// Declared configuration for a new agent session.
///
/// Serialized both as the body of a session-create request and (wrapped) as
/// the body of an inbound-call accept.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSpec {
    pub model: String,
    pub modalities: Vec<&'static str>,
    pub turn_detection: TurnDetection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
}

impl SessionSpec {
    /// The base spec shared by every path: audio+text modalities, server
    /// VAD, and the pinned prompt when one is configured.
    pub fn from_config(config: &AgentConfig) -> Self {
        let prompt = (!config.prompt_id.is_empty()).then(|| PromptRef {
            id: config.prompt_id.clone(),
            version: config.prompt_version.clone(),
        });
        Self {
            model: config.realtime_model.clone(),
            modalities: vec!["audio", "text"],
            turn_detection: TurnDetection::server_vad(),
            prompt,
            tools: None,
        }
    }

    /// Adds the tool catalog to the declared configuration.
    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = Some(tools);
        self
    }
}

#[derive(Serialize)]
struct AcceptBody {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    spec: SessionSpec,
}

/// A minted ephemeral session.
#[derive(Debug, Clone, Deserialize)]
pub struct EphemeralSession {
    pub client_secret: ClientSecret,
    #[serde(default)]
    pub model: Option<String>,
}

/// The short-lived secret authorizing one agent connection. The platform
/// has shipped both a bare string and an object shape; accept either.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientSecret {
    Object { value: String },
    Plain(String),
}

impl ClientSecret {
    pub fn value(&self) -> &str {
        match self {
            Self::Object { value } => value,
            Self::Plain(value) => value,
        }
    }
}

/// HTTP client for the platform's session endpoints.
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    config: AgentConfig,
}

impl SessionClient {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Mints an ephemeral credential for one agent connection.
    ///
    /// Fails loudly: any non-success upstream status is returned with its
    /// body intact. An ephemeral-credential failure always aborts the call
    /// attempt; there is no degraded mode.
    pub async fn create_session(&self, spec: &SessionSpec) -> Result<EphemeralSession, AgentError> {
        let url = format!("{}/v1/realtime/sessions", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("OpenAI-Beta", "realtime=v1")
            .json(spec)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), %body, "session create failed");
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let session: EphemeralSession = serde_json::from_str(&body)?;
        tracing::info!(
            model = session.model.as_deref().unwrap_or(&self.config.realtime_model),
            "minted ephemeral agent session"
        );
        Ok(session)
    }

    /// Issues an accept decision for an inbound SIP call.
    ///
    /// Must complete promptly: the platform's webhook deadline bounds this
    /// call. Failures carry the upstream body for the webhook response.
    pub async fn accept_call(&self, call_id: &str, spec: SessionSpec) -> Result<(), AgentError> {
        let url = format!("{}/v1/realtime/calls/{}/accept", self.config.base_url, call_id);
        let body = AcceptBody {
            kind: "realtime",
            spec,
        };
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            tracing::error!(status = status.as_u16(), %call_id, %body, "call accept failed");
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(%call_id, "inbound call accepted");
        Ok(())
    }
}
