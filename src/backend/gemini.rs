//! Google Gemini backend
//!
//! Uses `models/{model}:streamGenerateContent?alt=sse`. The briefing goes into
//! `systemInstruction`, prior turns become `user` / `model` contents.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::backend::sse::{send_streaming_request, sse_text_stream};
use crate::backend::{TextGenerationBackend, TextStream};
use crate::error::ChatError;
use crate::types::{ChatTurn, Role};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Gemini connection settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
    thought: Option<bool>,
}

/// Text of the first candidate, thought summaries excluded.
fn extract_text(data: &str) -> Result<Option<String>, ChatError> {
    let response: StreamResponse = serde_json::from_str(data)
        .map_err(|e| ChatError::Backend(format!("Failed to parse Gemini SSE JSON: {e}")))?;
    let text: String = response
        .candidates
        .into_iter()
        .flatten()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .into_iter()
        .flatten()
        .filter(|p| p.thought != Some(true))
        .filter_map(|p| p.text)
        .collect();
    Ok((!text.is_empty()).then_some(text))
}

fn build_request<'a>(
    system_brief: &'a str,
    prior_turns: &'a [ChatTurn],
    new_turn: &'a str,
) -> GenerateContentRequest<'a> {
    let mut contents: Vec<Content<'a>> = prior_turns
        .iter()
        .map(|turn| Content {
            role: Some(match turn.role {
                Role::User => "user",
                Role::Assistant => "model",
            }),
            parts: vec![Part { text: &turn.text }],
        })
        .collect();
    contents.push(Content {
        role: Some("user"),
        parts: vec![Part { text: new_turn }],
    });
    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part { text: system_brief }],
        },
        contents,
    }
}

/// Gemini streaming backend.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn api_key(&self) -> Result<&SecretString, ChatError> {
        self.config
            .api_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or_else(|| ChatError::Configuration("Gemini API key not configured".to_string()))
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl TextGenerationBackend for GeminiBackend {
    fn provider_id(&self) -> &str {
        "gemini"
    }

    fn ensure_configured(&self) -> Result<(), ChatError> {
        self.api_key().map(|_| ())
    }

    async fn generate_incremental(
        &self,
        system_brief: &str,
        prior_turns: &[ChatTurn],
        new_turn: &str,
    ) -> Result<TextStream, ChatError> {
        let api_key = self.api_key()?;
        let body = build_request(system_brief, prior_turns, new_turn);
        tracing::debug!(
            model = %self.config.model,
            turns = body.contents.len(),
            "starting Gemini stream"
        );

        let request = self
            .http_client
            .post(self.stream_url())
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body);
        let response = send_streaming_request(request, "Gemini").await?;
        Ok(sse_text_stream(response, "Gemini", None, extract_text))
    }
}
