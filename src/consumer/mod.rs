//! Stream Consumer
//!
//! Client side of the chat stream: a [`ChatSession`] reads a producer's
//! response through a [`ChatTransport`] and applies each event to its
//! transcript as it arrives.

pub mod session;
pub mod transport;

pub use session::{
    CONNECTION_PROBE, ChatSession, ConnectionReport, LENIENT_ERROR_PREFIX, STRICT_ERROR_PREFIX,
    SessionConfig, SessionConfigBuilder, SessionState,
};
pub use transport::{
    ByteStream, CHAT_PATH, CHAT_STREAM_PATH, ChatTransport, HttpTransport, LocalTransport,
};
