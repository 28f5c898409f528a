//! Stream Producer
//!
//! Turns one [`ChatStreamRequest`] into the event sequence
//! `start, chunk*, (done | error)` by driving a [`TextGenerationBackend`].
//! Configuration problems short-circuit to a single `error` event and the
//! backend is never called.
//!
//! ## Example
//!
//! ```rust,ignore
//! use swarmlab_chat::backend::ScriptedBackend;
//! use swarmlab_chat::producer::StreamProducer;
//!
//! let producer = StreamProducer::new(Arc::new(ScriptedBackend::new(["Hi"])));
//! let body = producer.frames(ChatStreamRequest::new("Explain results"));
//! ```

use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::TextGenerationBackend;
use crate::briefing::build_briefing;
use crate::error::ChatError;
use crate::streaming::{FrameByteStream, encode_event_stream};
use crate::types::{ChatStreamRequest, ChatTurn, StreamEvent};

/// Payload of the `start` event.
pub const START_INFO: &str = "Starting response...";

/// Payload of the `done` event.
pub const DONE_INFO: &str = "Response complete";

/// Number of prior messages forwarded to the backend by default.
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

/// Stream of events for one request. Ends after the terminal event.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Producer behaviour knobs.
#[derive(Debug, Clone)]
pub struct ProducerOptions {
    /// How many of the most recent history messages reach the backend.
    pub history_window: usize,

    /// Replace backend and transport error messages with a generic one.
    ///
    /// Configuration errors are never masked: they carry no provider detail
    /// and the user needs them to fix the setup.
    pub mask_errors: bool,

    /// Message used when `mask_errors` is set. Defaults to "internal error".
    pub masked_error_message: Option<String>,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            mask_errors: false,
            masked_error_message: None,
        }
    }
}

impl ProducerOptions {
    /// Options suitable for production (errors masked).
    pub fn production() -> Self {
        Self {
            mask_errors: true,
            ..Default::default()
        }
    }
}

/// Everything needed to call the backend for one request.
struct Prepared {
    backend: Arc<dyn TextGenerationBackend>,
    brief: String,
    turns: Vec<ChatTurn>,
}

/// Provider-agnostic stream producer.
#[derive(Clone)]
pub struct StreamProducer {
    backend: Option<Arc<dyn TextGenerationBackend>>,
    options: ProducerOptions,
}

impl std::fmt::Debug for StreamProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamProducer")
            .field("backend", &self.backend.as_ref().map(|b| b.provider_id()))
            .field("options", &self.options)
            .finish()
    }
}

impl StreamProducer {
    pub fn new(backend: Arc<dyn TextGenerationBackend>) -> Self {
        Self {
            backend: Some(backend),
            options: ProducerOptions::default(),
        }
    }

    /// A producer with no backend at all; every request fails with a configuration error.
    pub fn without_backend() -> Self {
        Self {
            backend: None,
            options: ProducerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProducerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn backend(&self) -> Option<&Arc<dyn TextGenerationBackend>> {
        self.backend.as_ref()
    }

    pub fn options(&self) -> &ProducerOptions {
        &self.options
    }

    /// Whether a backend is present and reports its credentials as configured.
    pub fn is_configured(&self) -> bool {
        self.ensure_ready().is_ok()
    }

    /// The backend, provided it exists and has its credentials.
    pub fn ensure_ready(&self) -> Result<Arc<dyn TextGenerationBackend>, ChatError> {
        let backend = self.backend.clone().ok_or_else(|| {
            ChatError::Configuration("No text-generation backend configured".to_string())
        })?;
        backend.ensure_configured()?;
        Ok(backend)
    }

    fn prepare(&self, request: &ChatStreamRequest) -> Result<Prepared, ChatError> {
        request.validate()?;
        let backend = self.ensure_ready()?;

        Ok(Prepared {
            brief: build_briefing(
                &request.simulation_results,
                request.swarm_type,
                &request.language,
            ),
            turns: request.recent_turns(self.options.history_window),
            backend,
        })
    }

    /// The `error` event for `err`, masked according to the options.
    pub fn error_event(&self, err: &ChatError) -> StreamEvent {
        StreamEvent::Error(self.error_message(err))
    }

    /// Message shown to the user for `err`, masked according to the options.
    pub fn error_message(&self, err: &ChatError) -> String {
        match err {
            ChatError::Configuration(_) => err.user_message(),
            _ if self.options.mask_errors => self
                .options
                .masked_error_message
                .clone()
                .unwrap_or_else(|| "internal error".to_string()),
            _ => err.user_message(),
        }
    }

    /// A stream consisting of the single `error` event for `err`.
    pub fn reject(&self, err: ChatError) -> EventStream {
        tracing::warn!(error = %err, "rejecting chat stream request");
        let event = self.error_event(&err);
        Box::pin(futures_util::stream::iter([event]))
    }

    /// Produce the events for one request.
    pub fn events(&self, request: ChatStreamRequest) -> EventStream {
        let producer = self.clone();
        let request_id = Uuid::new_v4();

        let out = async_stream::stream! {
            let prepared = match producer.prepare(&request) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(%request_id, error = %e, "chat stream not started");
                    yield producer.error_event(&e);
                    return;
                }
            };
            let provider = prepared.backend.provider_id().to_string();
            tracing::info!(
                %request_id,
                %provider,
                history = prepared.turns.len(),
                mode = request.swarm_type.as_str(),
                language = %request.language,
                "chat stream started"
            );

            yield StreamEvent::start(START_INFO);

            let mut increments = match prepared
                .backend
                .generate_incremental(&prepared.brief, &prepared.turns, &request.user_message)
                .await
            {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(%request_id, %provider, error = %e, "backend call failed");
                    yield producer.error_event(&e);
                    return;
                }
            };

            let mut chunks = 0usize;
            while let Some(item) = increments.next().await {
                match item {
                    Ok(text) if text.is_empty() => {}
                    Ok(text) => {
                        chunks += 1;
                        yield StreamEvent::Chunk(text);
                    }
                    Err(e) => {
                        tracing::error!(%request_id, %provider, chunks, error = %e, "backend stream failed");
                        yield producer.error_event(&e);
                        return;
                    }
                }
            }

            tracing::info!(%request_id, %provider, chunks, "chat stream complete");
            yield StreamEvent::done(DONE_INFO);
        };
        Box::pin(out)
    }

    /// Produce the encoded response body for one request.
    pub fn frames(&self, request: ChatStreamRequest) -> FrameByteStream {
        encode_event_stream(self.events(request))
    }

    /// Run the same pipeline without streaming and return the whole reply.
    pub async fn complete(&self, request: &ChatStreamRequest) -> Result<String, ChatError> {
        let prepared = self.prepare(request)?;
        let mut increments = prepared
            .backend
            .generate_incremental(&prepared.brief, &prepared.turns, &request.user_message)
            .await?;
        let mut reply = String::new();
        while let Some(text) = increments.next().await {
            reply.push_str(&text?);
        }
        Ok(reply)
    }
}
