//! Chat stream request body

use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::types::{ChatTurn, Message, SIMULATION_SCHEMA_VERSION, SimulationResults, SwarmMode};

/// Language used when a request does not name one.
pub const DEFAULT_LANGUAGE: &str = "English";

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Body of `POST /api/chat-stream` (and of the non-streaming `/api/chat`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatStreamRequest {
    pub user_message: String,
    #[serde(default)]
    pub simulation_results: SimulationResults,
    #[serde(default)]
    pub swarm_type: SwarmMode,
    #[serde(default)]
    pub chat_history: Vec<Message>,
    #[serde(default = "default_language")]
    pub language: String,
}

impl ChatStreamRequest {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            simulation_results: SimulationResults::default(),
            swarm_type: SwarmMode::default(),
            chat_history: Vec::new(),
            language: default_language(),
        }
    }

    pub fn with_results(mut self, results: SimulationResults) -> Self {
        self.simulation_results = results;
        self
    }

    pub fn with_mode(mut self, mode: SwarmMode) -> Self {
        self.swarm_type = mode;
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.chat_history = history;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Parse a raw request body. Shape errors become configuration errors.
    pub fn from_json(body: &[u8]) -> Result<Self, ChatError> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| ChatError::Configuration(format!("Invalid chat request: {e}")))?;
        request.validate()?;
        Ok(request)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.user_message.trim().is_empty() {
            return Err(ChatError::Configuration(
                "Invalid chat request: userMessage is empty".to_string(),
            ));
        }
        if self.simulation_results.version != SIMULATION_SCHEMA_VERSION {
            return Err(ChatError::Configuration(format!(
                "Unsupported simulation results version {} (expected {})",
                self.simulation_results.version, SIMULATION_SCHEMA_VERSION
            )));
        }
        Ok(())
    }

    /// The last `window` history entries as backend turns, oldest first.
    pub fn recent_turns(&self, window: usize) -> Vec<ChatTurn> {
        let skip = self.chat_history.len().saturating_sub(window);
        self.chat_history[skip..].iter().map(ChatTurn::from).collect()
    }
}
