//! HTTP server adapters
//!
//! Exposes a [`StreamProducer`](crate::producer::StreamProducer) over HTTP.
//! Only compiled with the `server` feature.

pub mod axum;

pub use self::axum::{AppState, ApiError, HEALTH_PATH, build_router, to_event_stream_response};
