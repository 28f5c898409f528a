//! OpenAI-compatible backend
//!
//! Streams `POST {base}/chat/completions` with `stream: true`. Works against
//! any server speaking the chat completions SSE dialect.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::backend::sse::{send_streaming_request, sse_text_stream};
use crate::backend::{TextGenerationBackend, TextStream};
use crate::error::ChatError;
use crate::types::{ChatTurn, Role};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible connection settings.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }
}

impl OpenAiConfig {
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
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Option<Vec<StreamChoice>>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

fn extract_text(data: &str) -> Result<Option<String>, ChatError> {
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| ChatError::Backend(format!("Failed to parse OpenAI SSE JSON: {e}")))?;
    Ok(chunk
        .choices
        .into_iter()
        .flatten()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|s| !s.is_empty()))
}

fn build_request<'a>(
    model: &'a str,
    system_brief: &'a str,
    prior_turns: &'a [ChatTurn],
    new_turn: &'a str,
) -> ChatCompletionRequest<'a> {
    let mut messages = Vec::with_capacity(prior_turns.len() + 2);
    messages.push(WireMessage {
        role: "system",
        content: system_brief,
    });
    messages.extend(prior_turns.iter().map(|turn| WireMessage {
        role: match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        },
        content: &turn.text,
    }));
    messages.push(WireMessage {
        role: "user",
        content: new_turn,
    });
    ChatCompletionRequest {
        model,
        stream: true,
        messages,
    }
}

/// OpenAI-compatible streaming backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    config: OpenAiConfig,
    http_client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig, http_client: reqwest::Client) -> Self {
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
            .ok_or_else(|| ChatError::Configuration("OpenAI API key not configured".to_string()))
    }
}

#[async_trait]
impl TextGenerationBackend for OpenAiBackend {
    fn provider_id(&self) -> &str {
        "openai"
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
        let body = build_request(&self.config.model, system_brief, prior_turns, new_turn);
        tracing::debug!(
            model = %self.config.model,
            messages = body.messages.len(),
            "starting OpenAI stream"
        );

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let request = self
            .http_client
            .post(url)
            .bearer_auth(api_key.expose_secret())
            .json(&body);
        let response = send_streaming_request(request, "OpenAI").await?;
        Ok(sse_text_stream(response, "OpenAI", Some("[DONE]"), extract_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_delta_content() {
        let data = r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"Hi"}}]}"#;
        assert_eq!(extract_text(data).unwrap(), Some("Hi".to_string()));

        let data = r#"{"id":"c1","choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(extract_text(data).unwrap(), None);

        let data = r#"{"id":"c1","choices":[],"usage":{"total_tokens":4}}"#;
        assert_eq!(extract_text(data).unwrap(), None);
    }

    #[test]
    fn request_puts_brief_first_and_new_turn_last() {
        let turns = vec![ChatTurn {
            role: Role::Assistant,
            text: "earlier".into(),
        }];
        let body =
            serde_json::to_value(build_request("gpt-4o-mini", "brief", &turns, "now")).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["messages"][2]["content"], "now");
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let backend = OpenAiBackend::new(OpenAiConfig::default(), reqwest::Client::new());
        let err = backend.ensure_configured().unwrap_err();
        assert_eq!(err.user_message(), "OpenAI API key not configured");
    }
}
