//! Stream events
//!
//! The unit the producer emits and the consumer applies. The wire form is a
//! `{"type": ..., "data": ...}` record where `data` is always a string.

use serde::{Deserialize, Serialize};

/// One event of a chat stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamEvent {
    /// The producer accepted the stream. Informational only.
    Start(String),
    /// One increment of assistant text.
    Chunk(String),
    /// Terminal success marker.
    Done(String),
    /// Terminal failure marker carrying a human-readable message.
    Error(String),
}

impl StreamEvent {
    pub fn start(info: impl Into<String>) -> Self {
        Self::Start(info.into())
    }

    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk(text.into())
    }

    pub fn done(info: impl Into<String>) -> Self {
        Self::Done(info.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Returns true for `done` and `error`; nothing follows a terminal event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Error(_))
    }

    /// Wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Chunk(_) => "chunk",
            Self::Done(_) => "done",
            Self::Error(_) => "error",
        }
    }

    /// Payload string regardless of the variant.
    pub fn data(&self) -> &str {
        match self {
            Self::Start(s) | Self::Chunk(s) | Self::Done(s) | Self::Error(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_type_and_data() {
        let json = serde_json::to_string(&StreamEvent::chunk("The ")).unwrap();
        assert_eq!(json, r#"{"type":"chunk","data":"The "}"#);
    }

    #[test]
    fn terminal_helpers() {
        assert!(StreamEvent::done("ok").is_terminal());
        assert!(StreamEvent::error("bad").is_terminal());
        assert!(!StreamEvent::start("go").is_terminal());
        assert_eq!(StreamEvent::error("bad").data(), "bad");
        assert_eq!(StreamEvent::chunk("x").kind(), "chunk");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let parsed = serde_json::from_str::<StreamEvent>(r#"{"type":"usage","data":"1"}"#);
        assert!(parsed.is_err());
    }
}
