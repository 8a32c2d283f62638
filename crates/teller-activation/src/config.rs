use serde::Deserialize;
use std::fmt;

fn default_channel() -> String {
    "IVR".to_string()
}

fn default_pan_prefix() -> String {
    "540375".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Configuration for the card-activation backend.
#[derive(Clone, Deserialize)]
pub struct ActivationConfig {
    /// Full URL of the activation endpoint.
    pub endpoint_url: String,

    /// Service account username for the backend's auth header.
    #[serde(default)]
    pub username: String,

    /// Service account password (pre-encoded as the backend expects).
    #[serde(default)]
    pub password: String,

    /// Additional auth key (pre-encoded as the backend expects).
    #[serde(default)]
    pub auth_key: String,

    /// Originating institution BIC code.
    #[serde(default)]
    pub bic_code: String,

    /// Originating country code.
    #[serde(default)]
    pub country_code: String,

    /// Channel identifier stamped on every request.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Card BIN used to build the masked PAN (`<bin>******<last4>`).
    #[serde(default = "default_pan_prefix")]
    pub pan_prefix: String,

    /// Total request timeout in seconds. There is no retry; a timeout
    /// surfaces as a failure outcome.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            username: String::new(),
            password: String::new(),
            auth_key: String::new(),
            bic_code: String::new(),
            country_code: String::new(),
            channel: default_channel(),
            pan_prefix: default_pan_prefix(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl fmt::Debug for ActivationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("auth_key", &"[REDACTED]")
            .field("bic_code", &self.bic_code)
            .field("country_code", &self.country_code)
            .field("channel", &self.channel)
            .field("pan_prefix", &self.pan_prefix)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
