//! Server configuration
//!
//! Everything the server binary needs, read from environment variables.
//! [`ServerConfig::from_lookup`] takes any lookup function so tests never
//! touch the process environment.

use std::net::SocketAddr;
use std::str::FromStr;

use crate::backend::{
    BackendKind, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_OPENAI_MODEL, GeminiConfig, OpenAiConfig,
};
use crate::error::{ChatError, Result};
use crate::producer::{DEFAULT_HISTORY_WINDOW, ProducerOptions};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backend: BackendKind,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
    pub history_window: usize,
    pub mask_errors: bool,
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            backend: BackendKind::default(),
            gemini: GeminiConfig::default(),
            openai: OpenAiConfig::default(),
            history_window: DEFAULT_HISTORY_WINDOW,
            mask_errors: false,
            environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ChatError::Configuration(format!("Invalid value for {key}: {value:?}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ChatError::Configuration(format!(
            "Invalid value for {key}: {value:?}"
        ))),
    }
}

impl ServerConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get("SWARMLAB_HOST") {
            config.host = host.trim().to_string();
        }
        if let Some(port) = get("SWARMLAB_PORT") {
            config.port = parse_var("SWARMLAB_PORT", &port)?;
        }
        if let Some(backend) = get("SWARMLAB_BACKEND") {
            config.backend = backend.parse()?;
        }

        let mut gemini = GeminiConfig::default()
            .with_model(get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()))
            .with_base_url(
                get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            );
        if let Some(key) = get("GEMINI_API_KEY") {
            gemini = gemini.with_api_key(key);
        }
        config.gemini = gemini;

        let mut openai = OpenAiConfig::default()
            .with_model(get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()))
            .with_base_url(
                get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            );
        if let Some(key) = get("OPENAI_API_KEY") {
            openai = openai.with_api_key(key);
        }
        config.openai = openai;

        if let Some(window) = get("SWARMLAB_HISTORY_WINDOW") {
            config.history_window = parse_var("SWARMLAB_HISTORY_WINDOW", &window)?;
        }
        if let Some(mask) = get("SWARMLAB_MASK_ERRORS") {
            config.mask_errors = parse_bool("SWARMLAB_MASK_ERRORS", &mask)?;
        }
        if let Some(environment) = get("SWARMLAB_ENV") {
            config.environment = environment.trim().to_string();
        }
        Ok(config)
    }

    /// Address the server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            ChatError::Configuration(format!("Invalid bind address {}:{}", self.host, self.port))
        })
    }

    pub fn producer_options(&self) -> ProducerOptions {
        ProducerOptions {
            history_window: self.history_window,
            mask_errors: self.mask_errors,
            masked_error_message: None,
        }
    }
}
