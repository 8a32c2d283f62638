//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use teller_activation::ActivationConfig;
use teller_agent::AgentConfig;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Call record storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Agent platform settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Card activation backend settings.
    #[serde(default)]
    pub activation: ActivationConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public base URL of this server (e.g. the tunnel URL the carrier
    /// reaches). When unset, the media-stream URL is derived per-request
    /// from the `Host` and `X-Forwarded-Proto` headers.
    #[serde(default)]
    pub public_url: Option<String>,
}

/// Call record storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file per call record.
    #[serde(default = "default_calls_dir")]
    pub calls_dir: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "teller_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_calls_dir() -> String {
    "calls".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            calls_dir: default_calls_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `TELLER_HOST` overrides `server.host`
/// - `TELLER_PORT` overrides `server.port`
/// - `TELLER_PUBLIC_URL` overrides `server.public_url`
/// - `TELLER_CALLS_DIR` overrides `storage.calls_dir`
/// - `TELLER_LOG_LEVEL` overrides `logging.level`
/// - `TELLER_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `OPENAI_API_KEY` overrides `agent.api_key`
/// - `OPENAI_REALTIME_MODEL` overrides `agent.realtime_model`
/// - `TELLER_ACTIVATION_URL` overrides `activation.endpoint_url`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("TELLER_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("TELLER_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(url) = std::env::var("TELLER_PUBLIC_URL") {
        if !url.trim().is_empty() {
            config.server.public_url = Some(url);
        }
    }
    if let Ok(dir) = std::env::var("TELLER_CALLS_DIR") {
        config.storage.calls_dir = dir;
    }
    if let Ok(level) = std::env::var("TELLER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("TELLER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        config.agent.api_key = key;
    }
    if let Ok(model) = std::env::var("OPENAI_REALTIME_MODEL") {
        config.agent.realtime_model = model;
    }
    if let Ok(url) = std::env::var("TELLER_ACTIVATION_URL") {
        config.activation.endpoint_url = url;
    }

    Ok(config)
}
