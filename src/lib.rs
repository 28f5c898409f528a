//! # swarmlab-chat
//!
//! Incremental chat-stream transport for the Swarm Lab simulation assistant.
//!
#![deny(unsafe_code)]

//! A [`StreamProducer`] relays a language-model reply as framed events over one
//! HTTP response:
//!
//! ```text
//! data: {"type":"start","data":"Starting response..."}
//!
//! data: {"type":"chunk","data":"The ACO "}
//!
//! data: {"type":"done","data":"Response complete"}
//! ```
//!
//! A [`ChatSession`] reads that body incrementally and grows the assistant
//! message of its transcript as chunks arrive.
//!
//! ## Modules
//!
//! - [`types`]: messages, events, requests and simulation results
//! - [`streaming`]: frame encoding and incremental decoding
//! - [`backend`]: text-generation providers (Gemini, OpenAI-compatible, scripted)
//! - [`briefing`]: system instruction rendered from simulation results
//! - [`producer`] / [`consumer`]: the two ends of the stream
//! - `server`: axum routes (feature `server`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use swarmlab_chat::prelude::*;
//!
//! let producer = StreamProducer::new(Arc::new(ScriptedBackend::new(["Hello"])));
//! let session = ChatSession::new(Arc::new(LocalTransport::new(producer)));
//! let reply = session
//!     .send("Explain results", SimulationResults::default(), SwarmMode::Both)
//!     .await?;
//! ```

pub mod backend;
pub mod briefing;
pub mod config;
pub mod consumer;
pub mod error;
pub mod producer;
#[cfg(feature = "server")]
pub mod server;
pub mod streaming;
pub mod telemetry;
pub mod types;

pub use consumer::{ChatSession, ChatTransport, HttpTransport, LocalTransport, SessionConfig};
pub use error::{ChatError, Result};
pub use producer::{ProducerOptions, StreamProducer};
pub use types::{ChatStreamRequest, Message, Role, SimulationResults, StreamEvent, SwarmMode};

/// Commonly used items.
pub mod prelude {
    pub use crate::backend::{
        BackendKind, GeminiBackend, GeminiConfig, OpenAiBackend, OpenAiConfig, ScriptedBackend,
        TextGenerationBackend, build_backend,
    };
    pub use crate::briefing::build_briefing;
    pub use crate::consumer::{
        ChatSession, ChatTransport, ConnectionReport, HttpTransport, LocalTransport,
        SessionConfig, SessionState,
    };
    pub use crate::error::{ChatError, Result};
    pub use crate::producer::{ProducerOptions, StreamProducer};
    pub use crate::types::*;
}
