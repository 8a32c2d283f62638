use serde::Deserialize;
use std::fmt;

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_realtime_model() -> String {
    "gpt-realtime".to_string()
}

fn default_summary_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Configuration for the agent platform.
#[derive(Clone, Deserialize)]
pub struct AgentConfig {
    /// Platform API key. Loaded from the environment, never from the
    /// config file checked into deployment repos.
    #[serde(default)]
    pub api_key: String,

    /// Platform base URL. Overridable so tests can point at a mock server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Realtime speech-to-speech model.
    #[serde(default = "default_realtime_model")]
    pub realtime_model: String,

    /// Chat model used for call summaries.
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Prompt identifier pinned to the deployed agent behavior.
    #[serde(default)]
    pub prompt_id: String,

    /// Version of the pinned prompt.
    #[serde(default)]
    pub prompt_version: String,

    /// Whether SIP-originated calls accepted via the webhook get the tool
    /// catalog. The telephony-stream path always declares the tools; this
    /// switch controls the webhook path only.
    #[serde(default)]
    pub webhook_tools: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            realtime_model: default_realtime_model(),
            summary_model: default_summary_model(),
            prompt_id: String::new(),
            prompt_version: String::new(),
            webhook_tools: false,
        }
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("realtime_model", &self.realtime_model)
            .field("summary_model", &self.summary_model)
            .field("prompt_id", &self.prompt_id)
            .field("prompt_version", &self.prompt_version)
            .field("webhook_tools", &self.webhook_tools)
            .finish()
    }
}
