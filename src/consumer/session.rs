//! Chat session
//!
//! A [`ChatSession`] owns one conversation transcript. Every mutation is
//! published through a `tokio::sync::watch` channel so a UI can render the
//! assistant reply while it grows.
//!
//! ## Example
//!
//! ```rust,ignore
//! let session = ChatSession::new(Arc::new(HttpTransport::new("http://127.0.0.1:3000")));
//! let mut updates = session.subscribe();
//! let reply = session
//!     .send("Explain results", results, SwarmMode::Both)
//!     .await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::consumer::transport::ChatTransport;
use crate::error::ChatError;
use crate::streaming::{FrameEventStream, decode_frames};
use crate::types::{
    ChatStreamRequest, DEFAULT_LANGUAGE, Message, SimulationResults, StreamEvent, SwarmMode,
};

/// Placeholder prefix written by [`ChatSession::send`] on failure.
pub const STRICT_ERROR_PREFIX: &str = "Error: ";

/// Placeholder prefix written by [`ChatSession::send_lenient`] on failure.
pub const LENIENT_ERROR_PREFIX: &str = "Sorry, an error occurred: ";

/// Message sent by [`ChatSession::test_connection`].
pub const CONNECTION_PROBE: &str = "Hello, test streaming connection";

const PROBE_PREVIEW_CHARS: usize = 100;

/// Observable snapshot of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub messages: Vec<Message>,
    pub busy: bool,
    pub last_error: Option<String>,
}

impl SessionState {
    /// Number of messages currently marked as streaming. Never more than one.
    pub fn streaming_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_streaming).count()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Client-side session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Response language forwarded with every request.
    pub language: String,
    /// Fail a send when no frame arrives for this long. Off when `None`.
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            idle_timeout: None,
        }
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    language: Option<String>,
    idle_timeout: Option<Duration>,
}

impl SessionConfigBuilder {
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> SessionConfig {
        SessionConfig {
            language: self
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            idle_timeout: self.idle_timeout,
        }
    }
}

/// Outcome of [`ChatSession::test_connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorStyle {
    Strict,
    Lenient,
}

impl ErrorStyle {
    fn prefix(self) -> &'static str {
        match self {
            Self::Strict => STRICT_ERROR_PREFIX,
            Self::Lenient => LENIENT_ERROR_PREFIX,
        }
    }
}

/// The single stream a session may run at a time.
#[derive(Debug, Default)]
struct StreamSlot {
    token: CancellationToken,
    in_flight: bool,
}

/// Releases the in-flight slot and clears streaming flags on every exit path,
/// including the send future being dropped.
///
/// A guard whose epoch was retired by [`ChatSession::clear`] owns nothing any
/// more: it neither writes to the transcript nor releases the slot.
struct InFlightGuard<'a> {
    session: &'a ChatSession,
    epoch: u64,
    token: CancellationToken,
    placeholder: Option<usize>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(session: &'a ChatSession) -> Result<Self, ChatError> {
        let mut slot = session.lock_slot();
        if slot.in_flight {
            return Err(ChatError::Busy);
        }
        slot.in_flight = true;
        slot.token = CancellationToken::new();
        Ok(Self {
            session,
            epoch: session.epoch.load(Ordering::Acquire),
            token: slot.token.clone(),
            placeholder: None,
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.session.lock_slot();
        let placeholder = self.placeholder;
        let current = self.session.update(self.epoch, |state| {
            if let Some(message) = placeholder.and_then(|i| state.messages.get_mut(i)) {
                message.is_streaming = false;
            }
            state.busy = false;
        });
        if current {
            slot.in_flight = false;
        }
    }
}

/// One conversation with a chat-stream producer.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    state: watch::Sender<SessionState>,
    language: RwLock<String>,
    idle_timeout: Option<Duration>,
    slot: Mutex<StreamSlot>,
    /// Bumped by `clear`; writes tagged with an older epoch are dropped.
    epoch: AtomicU64,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("state", &*self.state.borrow())
            .field("language", &self.language())
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    pub fn with_config(transport: Arc<dyn ChatTransport>, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            transport,
            state,
            language: RwLock::new(config.language),
            idle_timeout: config.idle_timeout,
            slot: Mutex::new(StreamSlot::default()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Receiver notified after every transcript mutation.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Current state, cloned.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn language(&self) -> String {
        self.language
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Language used by subsequent sends.
    pub fn set_language(&self, language: impl Into<String>) {
        *self
            .language
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = language.into();
    }

    /// Stop the active stream. The reply received so far is kept as final.
    pub fn cancel(&self) {
        self.lock_slot().token.cancel();
    }

    /// Empty the transcript and reset every flag in one update.
    ///
    /// An active stream is cancelled and detached: it no longer touches the
    /// transcript, and the session accepts a new send straight away.
    pub fn clear(&self) {
        let mut slot = self.lock_slot();
        slot.token.cancel();
        slot.in_flight = false;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.state.send_modify(|state| *state = SessionState::default());
    }

    /// Stream a reply. On failure the placeholder becomes `"Error: {message}"`
    /// and the error is returned.
    pub async fn send(
        &self,
        text: &str,
        results: SimulationResults,
        mode: SwarmMode,
    ) -> Result<String, ChatError> {
        self.stream_reply(text, results, mode, ErrorStyle::Strict)
            .await
    }

    /// Stream a reply, swallowing stream failures.
    ///
    /// On failure the placeholder becomes `"Sorry, an error occurred: {message}"`
    /// and that text is returned. Blank input and overlapping sends still fail.
    pub async fn send_lenient(
        &self,
        text: &str,
        results: SimulationResults,
        mode: SwarmMode,
    ) -> Result<String, ChatError> {
        self.stream_reply(text, results, mode, ErrorStyle::Lenient)
            .await
    }

    /// Non-streaming variant: one request, one appended assistant message.
    pub async fn send_fallback(
        &self,
        text: &str,
        results: SimulationResults,
        mode: SwarmMode,
    ) -> Result<String, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        let guard = InFlightGuard::acquire(self)?;
        let epoch = guard.epoch;

        let history = self.state.borrow().messages.clone();
        self.update(epoch, |state| {
            state.messages.push(Message::user(text));
            state.busy = true;
            state.last_error = None;
        });

        let request = self.build_request(text, results, mode, history);
        match self.transport.complete(&request).await {
            Ok(reply) => {
                self.update(epoch, |state| {
                    state.messages.push(Message::assistant(reply.clone()))
                });
                Ok(reply)
            }
            Err(e) => {
                let message = e.user_message();
                tracing::warn!(error = %e, "fallback request failed");
                self.update(epoch, |state| {
                    state.last_error = Some(message.clone());
                    state
                        .messages
                        .push(Message::assistant(format!("{STRICT_ERROR_PREFIX}{message}")));
                });
                Err(e)
            }
        }
    }

    /// Send a probe message through the streaming path and summarize the outcome.
    pub async fn test_connection(&self) -> ConnectionReport {
        match self
            .send(CONNECTION_PROBE, SimulationResults::default(), SwarmMode::Both)
            .await
        {
            Ok(reply) => {
                let mut preview: String = reply.chars().take(PROBE_PREVIEW_CHARS).collect();
                if reply.chars().count() > PROBE_PREVIEW_CHARS {
                    preview.push_str("...");
                }
                ConnectionReport {
                    success: true,
                    message: format!("Streaming connection works! Response: {preview}"),
                }
            }
            Err(e) => ConnectionReport {
                success: false,
                message: format!("Streaming test failed: {}", e.user_message()),
            },
        }
    }

    fn build_request(
        &self,
        text: &str,
        results: SimulationResults,
        mode: SwarmMode,
        history: Vec<Message>,
    ) -> ChatStreamRequest {
        ChatStreamRequest::new(text)
            .with_results(results)
            .with_mode(mode)
            .with_history(history)
            .with_language(self.language())
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, StreamSlot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `f` and notify subscribers, unless `clear` retired `epoch`.
    fn update(&self, epoch: u64, f: impl FnOnce(&mut SessionState)) -> bool {
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::Acquire) != epoch {
                return false;
            }
            f(state);
            true
        })
    }

    async fn stream_reply(
        &self,
        text: &str,
        results: SimulationResults,
        mode: SwarmMode,
        style: ErrorStyle,
    ) -> Result<String, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        let mut guard = InFlightGuard::acquire(self)?;
        let epoch = guard.epoch;
        let token = guard.token.clone();

        let history = self.state.borrow().messages.clone();
        let mut placeholder = 0;
        self.update(epoch, |state| {
            state.messages.push(Message::user(text));
            state.messages.push(Message::placeholder());
            placeholder = state.messages.len() - 1;
            state.busy = true;
            state.last_error = None;
        });
        guard.placeholder = Some(placeholder);

        let request = self.build_request(text, results, mode, history);
        match self.consume(&request, placeholder, epoch, &token).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                let message = e.user_message();
                tracing::warn!(error = %e, "chat stream failed");
                let content = format!("{}{message}", style.prefix());
                self.update(epoch, |state| {
                    state.last_error = Some(message.clone());
                    if let Some(m) = state.messages.get_mut(placeholder) {
                        m.content = content.clone();
                    }
                });
                match style {
                    ErrorStyle::Strict => Err(e),
                    ErrorStyle::Lenient => Ok(content),
                }
            }
        }
    }

    async fn next_event(
        &self,
        events: &mut FrameEventStream,
    ) -> Result<Option<Result<StreamEvent, ChatError>>, ChatError> {
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, events.next())
                .await
                .map_err(|_| ChatError::Timeout(limit.as_millis() as u64)),
            None => Ok(events.next().await),
        }
    }

    /// Read the stream into the placeholder at `index`.
    ///
    /// Returns the text received, which is what the placeholder holds unless
    /// the session was cleared meanwhile.
    async fn consume(
        &self,
        request: &ChatStreamRequest,
        index: usize,
        epoch: u64,
        token: &CancellationToken,
    ) -> Result<String, ChatError> {
        let open = self.transport.open_stream(request);
        let body = tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("cancelled before the stream opened");
                return Ok(String::new());
            }
            opened = async {
                match self.idle_timeout {
                    Some(limit) => tokio::time::timeout(limit, open)
                        .await
                        .unwrap_or_else(|_| Err(ChatError::Timeout(limit.as_millis() as u64))),
                    None => open.await,
                }
            } => opened?,
        };

        let mut events = decode_frames(body);
        let mut reply = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("stream cancelled");
                    break;
                }
                next = self.next_event(&mut events) => next?,
            };
            let Some(item) = next else {
                tracing::debug!("stream ended without done");
                break;
            };

            match item {
                Ok(StreamEvent::Start(info)) => tracing::debug!(%info, "stream started"),
                Ok(StreamEvent::Chunk(text)) => {
                    tracing::trace!(len = text.len(), "chunk");
                    reply.push_str(&text);
                    self.update(epoch, |state| {
                        if let Some(m) = state.messages.get_mut(index) {
                            m.content.push_str(&text);
                        }
                    });
                }
                Ok(StreamEvent::Done(info)) => {
                    tracing::debug!(%info, "stream done");
                    return Ok(reply);
                }
                Ok(StreamEvent::Error(message)) => return Err(ChatError::Remote(message)),
                Err(e) if !e.is_fatal_to_stream() => {
                    tracing::warn!(error = %e, "skipping malformed frame");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(reply)
    }
}
