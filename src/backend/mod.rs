//! Text-generation backends
//!
//! The producer depends only on [`TextGenerationBackend`]. Each provider is one
//! implementation of it; none of them know about frames or transcripts.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ChatError;
use crate::types::ChatTurn;

pub mod gemini;
pub mod openai;
pub mod scripted;
mod sse;

pub use gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiBackend, GeminiConfig};
pub use openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, OpenAiBackend, OpenAiConfig};
pub use scripted::{ScriptedBackend, ScriptedCall};

/// Lazy, finite sequence of text increments. Not restartable.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// Capability of producing an incremental completion.
#[async_trait]
pub trait TextGenerationBackend: Send + Sync {
    /// Short provider name used in logs and health reports.
    fn provider_id(&self) -> &str;

    /// Fail with `ChatError::Configuration` when credentials are missing.
    ///
    /// Called before any frame is emitted so a misconfigured backend never
    /// produces a `start` frame.
    fn ensure_configured(&self) -> Result<(), ChatError> {
        Ok(())
    }

    /// Start generating a reply to `new_turn`.
    ///
    /// `system_brief` is a system-level instruction and `prior_turns` the
    /// conversation so far, oldest first.
    async fn generate_incremental(
        &self,
        system_brief: &str,
        prior_turns: &[ChatTurn],
        new_turn: &str,
    ) -> Result<TextStream, ChatError>;
}

/// Which backend implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Gemini,
    OpenAi,
    Scripted,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Scripted => "scripted",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            "scripted" | "demo" => Ok(Self::Scripted),
            other => Err(ChatError::Configuration(format!(
                "Unknown backend: {other}. Valid options: gemini, openai, scripted"
            ))),
        }
    }
}

/// Build the configured backend. Missing credentials are not an error here:
/// they surface per request through [`TextGenerationBackend::ensure_configured`].
pub fn build_backend(
    kind: BackendKind,
    gemini: GeminiConfig,
    openai: OpenAiConfig,
) -> Result<Arc<dyn TextGenerationBackend>, ChatError> {
    let http_client = reqwest::Client::builder()
        .build()
        .map_err(|e| ChatError::Configuration(format!("Failed to build HTTP client: {e}")))?;

    let backend: Arc<dyn TextGenerationBackend> = match kind {
        BackendKind::Gemini => Arc::new(GeminiBackend::new(gemini, http_client)),
        BackendKind::OpenAi => Arc::new(OpenAiBackend::new(openai, http_client)),
        BackendKind::Scripted => Arc::new(ScriptedBackend::demo()),
    };
    tracing::info!(provider = backend.provider_id(), "text-generation backend ready");
    Ok(backend)
}
