//! Gemini and OpenAI-compatible backends against mocked provider APIs.

use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use swarmlab_chat::backend::{
    GeminiBackend, GeminiConfig, OpenAiBackend, OpenAiConfig, TextGenerationBackend,
};
use swarmlab_chat::types::{ChatTurn, Role};
use swarmlab_chat::ChatError;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn read_text(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path).expect("read fixture text")
}

fn prior_turns() -> Vec<ChatTurn> {
    vec![
        ChatTurn {
            role: Role::User,
            text: "What is makespan?".into(),
        },
        ChatTurn {
            role: Role::Assistant,
            text: "The time until the last task finishes.".into(),
        },
    ]
}

#[tokio::test]
async fn gemini_streams_text_increments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "KEY"))
        .and(body_partial_json(serde_json::json!({
            "systemInstruction": {"parts": [{"text": "brief"}]},
            "contents": [
                {"role": "user"},
                {"role": "model"},
                {"role": "user", "parts": [{"text": "Explain results"}]}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            read_text(fixtures_dir().join("gemini").join("stream.sse")),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(
        GeminiConfig::default()
            .with_api_key("KEY")
            .with_base_url(format!("{}/v1beta", server.uri())),
        reqwest::Client::new(),
    );
    let chunks: Vec<_> = backend
        .generate_incremental("brief", &prior_turns(), "Explain results")
        .await
        .unwrap()
        .collect()
        .await;

    let chunks: Vec<String> = chunks.into_iter().map(|c| c.unwrap()).collect();
    assert_eq!(chunks, vec!["The ACO ", "algorithm performed better."]);
}

#[tokio::test]
async fn gemini_error_status_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(
        GeminiConfig::default()
            .with_api_key("KEY")
            .with_base_url(server.uri()),
        reqwest::Client::new(),
    );
    let err = backend
        .generate_incremental("brief", &[], "hi")
        .await
        .err()
        .unwrap();
    assert_eq!(
        err,
        ChatError::Backend("Gemini API error 429: quota exceeded".into())
    );
}

#[tokio::test]
async fn gemini_without_key_never_sends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(
        GeminiConfig::default().with_base_url(server.uri()),
        reqwest::Client::new(),
    );
    let err = backend
        .generate_incremental("brief", &[], "hi")
        .await
        .err()
        .unwrap();
    assert_eq!(err.user_message(), "Gemini API key not configured");
}

#[tokio::test]
async fn openai_streams_until_done_marker() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "stream": true,
            "messages": [
                {"role": "system", "content": "brief"},
                {"role": "user"},
                {"role": "assistant"},
                {"role": "user", "content": "Explain results"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            read_text(fixtures_dir().join("openai").join("stream.sse")),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(
        OpenAiConfig::default()
            .with_api_key("sk-test")
            .with_base_url(format!("{}/v1", server.uri())),
        reqwest::Client::new(),
    );
    let text: Vec<String> = backend
        .generate_incremental("brief", &prior_turns(), "Explain results")
        .await
        .unwrap()
        .map(|c| c.unwrap())
        .collect()
        .await;
    assert_eq!(text.concat(), "PSO balanced the load.");
    assert_eq!(text.len(), 2);
}

#[tokio::test]
async fn openai_malformed_payload_ends_stream_with_error() {
    let server = MockServer::start().await;
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: {not json\n\n";
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(
        OpenAiConfig::default()
            .with_api_key("sk-test")
            .with_base_url(server.uri()),
        reqwest::Client::new(),
    );
    let items: Vec<_> = backend
        .generate_incremental("brief", &[], "hi")
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Ok("ok".to_string()));
    assert!(matches!(items[1], Err(ChatError::Backend(_))));
}
