//! Axum routes
//!
//! - `POST /api/chat-stream`: framed event stream, always `200 text/event-stream`
//! - `POST /api/chat`: whole reply as JSON
//! - `GET /api/test`: health and configuration probe
//!
//! ## Example
//!
//! ```rust,ignore
//! let state = AppState::new(producer, BackendKind::Gemini, "development");
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, build_router(state)).await?;
//! ```

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;

use crate::backend::BackendKind;
use crate::consumer::{CHAT_PATH, CHAT_STREAM_PATH};
use crate::error::ChatError;
use crate::producer::StreamProducer;
use crate::streaming::{FrameByteStream, encode_event_stream};
use crate::types::ChatStreamRequest;

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/api/test";

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    producer: StreamProducer,
    backend: BackendKind,
    environment: String,
}

impl AppState {
    pub fn new(producer: StreamProducer, backend: BackendKind, environment: impl Into<String>) -> Self {
        Self {
            producer,
            backend,
            environment: environment.into(),
        }
    }

    pub fn producer(&self) -> &StreamProducer {
        &self.producer
    }
}

/// Router serving every chat endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(CHAT_STREAM_PATH, post(chat_stream))
        .route(CHAT_PATH, post(chat))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

/// Wrap encoded frames in a `text/event-stream` response.
pub fn to_event_stream_response(frames: FrameByteStream) -> Response {
    let mut response = Response::new(Body::from_stream(frames));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

async fn chat_stream(State(state): State<AppState>, body: Bytes) -> Response {
    // Request-shape errors still travel in-band so the client sees one error frame.
    let events = match ChatStreamRequest::from_json(&body) {
        Ok(request) => state.producer.events(request),
        Err(e) => state.producer.reject(e),
    };
    to_event_stream_response(encode_event_stream(events))
}

/// JSON error body of the non-streaming endpoints.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ChatReply {
    response: String,
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<ChatReply>, ApiError> {
    let request = ChatStreamRequest::from_json(&body)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.user_message()))?;
    state
        .producer
        .ensure_ready()
        .map_err(|e| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, e.user_message()))?;

    match state.producer.complete(&request).await {
        Ok(response) => Ok(Json(ChatReply { response })),
        Err(e) => {
            tracing::error!(error = %e, "chat completion failed");
            let status = match e {
                ChatError::Configuration(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err(ApiError::new(status, state.producer.error_message(&e)))
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "Server API is working",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "hasBackendKey": state.producer.is_configured(),
        "backend": state.backend.as_str(),
        "environment": state.environment,
    }))
}
