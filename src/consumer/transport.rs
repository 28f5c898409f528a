//! Transports
//!
//! How a [`ChatSession`](crate::consumer::ChatSession) reaches a producer.
//! [`HttpTransport`] talks to a running server, [`LocalTransport`] drives a
//! [`StreamProducer`] in the same process.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;

use crate::error::ChatError;
use crate::producer::StreamProducer;
use crate::types::ChatStreamRequest;

/// Path of the streaming endpoint.
pub const CHAT_STREAM_PATH: &str = "/api/chat-stream";

/// Path of the non-streaming endpoint.
pub const CHAT_PATH: &str = "/api/chat";

/// Raw response body, read incrementally.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ChatError>> + Send>>;

/// Connection to a chat-stream producer.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open a streaming response for `request`.
    ///
    /// Fails before any body is read when the producer cannot be reached or
    /// answers with a non-success status.
    async fn open_stream(&self, request: &ChatStreamRequest) -> Result<ByteStream, ChatError>;

    /// Request the whole reply in one response.
    async fn complete(&self, request: &ChatStreamRequest) -> Result<String, ChatError>;
}

#[derive(Debug, Deserialize)]
struct CompleteResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Transport over HTTP using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// `base_url` is the server origin, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open_stream(&self, request: &ChatStreamRequest) -> Result<ByteStream, ChatError> {
        let response = self
            .http_client
            .post(self.endpoint(CHAT_STREAM_PATH))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::HttpStatus {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        tracing::debug!(status = status.as_u16(), "chat stream opened");

        Ok(Box::pin(
            response.bytes_stream().map(|chunk| chunk.map_err(ChatError::from)),
        ))
    }

    async fn complete(&self, request: &ChatStreamRequest) -> Result<String, ChatError> {
        let response = self
            .http_client
            .post(self.endpoint(CHAT_PATH))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            // Prefer the server's message over the raw JSON envelope.
            let body = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.trim().to_string());
            return Err(ChatError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: CompleteResponse = serde_json::from_str(&body)?;
        Ok(parsed.response)
    }
}

/// In-process transport: frames come straight from a [`StreamProducer`].
#[derive(Debug, Clone)]
pub struct LocalTransport {
    producer: StreamProducer,
}

impl LocalTransport {
    pub fn new(producer: StreamProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl ChatTransport for LocalTransport {
    async fn open_stream(&self, request: &ChatStreamRequest) -> Result<ByteStream, ChatError> {
        let frames = self.producer.frames(request.clone());
        Ok(Box::pin(frames.map(|chunk| match chunk {
            Ok(bytes) => Ok(bytes),
            Err(never) => match never {},
        })))
    }

    async fn complete(&self, request: &ChatStreamRequest) -> Result<String, ChatError> {
        self.producer.complete(request).await
    }
}
