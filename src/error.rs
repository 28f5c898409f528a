//! Error Handling Module
//!
//! A single error type shared by the producer, the consumer and the backends.
//! Every variant renders to a plain string through [`ChatError::user_message`],
//! which is the only form the UI layer ever receives.

use thiserror::Error;

/// Errors raised anywhere in the chat-stream pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Credential or configuration missing, or a request that does not match the schema.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The text-generation backend failed before or during generation.
    #[error("Backend error: {0}")]
    Backend(String),

    /// One malformed frame on the wire. Never fatal to the stream.
    #[error("Frame parse error: {0}")]
    FrameParse(String),

    /// Network failure while opening or reading the response body.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The producer answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The producer reported a failure in-band with an `error` frame.
    #[error("{0}")]
    Remote(String),

    /// No bytes arrived within the configured idle timeout.
    #[error("Stream idle for more than {0} ms")]
    Timeout(u64),

    /// `send` was called with blank input.
    #[error("Message is empty")]
    EmptyInput,

    /// `send` was called while another stream is still in flight on the same session.
    #[error("A response is already streaming for this session")]
    Busy,

    /// Serialization failure outside of frame decoding.
    #[error("JSON error: {0}")]
    Json(String),
}

impl ChatError {
    /// Human-readable message used for `error` frames and transcript text.
    ///
    /// Configuration, backend and remote errors carry their message verbatim so
    /// the user sees e.g. `Gemini API key not configured` rather than a prefixed form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(msg) | Self::Backend(msg) | Self::Remote(msg) => msg.clone(),
            Self::HttpStatus { status, body } if body.trim().is_empty() => {
                format!("HTTP Error: {status}")
            }
            other => other.to_string(),
        }
    }

    /// Whether this error ends a stream. Only frame parse errors are skipped.
    pub fn is_fatal_to_stream(&self) -> bool {
        !matches!(self, Self::FrameParse(_))
    }

    /// HTTP status used when the error is returned outside of an event stream.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Configuration(_) | Self::EmptyInput | Self::Json(_) | Self::FrameParse(_) => 400,
            Self::Busy => 409,
            Self::Timeout(_) => 504,
            Self::Backend(_) | Self::Transport(_) | Self::Remote(_) => 502,
            Self::HttpStatus { status, .. } => *status,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ChatError>;
