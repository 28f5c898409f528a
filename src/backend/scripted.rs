//! Scripted backend
//!
//! Replays a fixed list of increments. Serves the server's demo mode and lets
//! tests drive the producer without a network.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backend::{TextGenerationBackend, TextStream};
use crate::error::ChatError;
use crate::types::ChatTurn;

/// What the backend was asked to do, recorded per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCall {
    pub system_brief: String,
    pub prior_turns: Vec<ChatTurn>,
    pub new_turn: String,
}

/// Backend that yields a predetermined script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    chunks: Vec<String>,
    delay: Option<Duration>,
    fail_after: Option<(usize, String)>,
    fail_on_start: Option<String>,
    calls: Arc<Mutex<Vec<ScriptedCall>>>,
}

impl ScriptedBackend {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Script used by the server when no real provider is selected.
    pub fn demo() -> Self {
        Self::new([
            "This is a ",
            "scripted reply ",
            "from the Swarm Lab ",
            "demo backend.",
        ])
        .with_delay(Duration::from_millis(40))
    }

    /// Sleep before each increment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Yield `count` increments, then fail with `message`.
    pub fn fail_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.fail_after = Some((count, message.into()));
        self
    }

    /// Reject the generation call itself.
    pub fn fail_on_start(mut self, message: impl Into<String>) -> Self {
        self.fail_on_start = Some(message.into());
        self
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl TextGenerationBackend for ScriptedBackend {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    async fn generate_incremental(
        &self,
        system_brief: &str,
        prior_turns: &[ChatTurn],
        new_turn: &str,
    ) -> Result<TextStream, ChatError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ScriptedCall {
                system_brief: system_brief.to_string(),
                prior_turns: prior_turns.to_vec(),
                new_turn: new_turn.to_string(),
            });

        if let Some(message) = &self.fail_on_start {
            return Err(ChatError::Backend(message.clone()));
        }

        let chunks = self.chunks.clone();
        let delay = self.delay;
        let fail_after = self.fail_after.clone();
        let out = async_stream::stream! {
            for (i, chunk) in chunks.into_iter().enumerate() {
                if let Some((count, message)) = &fail_after {
                    if i == *count {
                        yield Err(ChatError::Backend(message.clone()));
                        return;
                    }
                }
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(chunk);
            }
            if let Some((count, message)) = fail_after {
                yield Err(ChatError::Backend(format!("{message} (after {count} chunks)")));
            }
        };
        Ok(Box::pin(out))
    }
}
