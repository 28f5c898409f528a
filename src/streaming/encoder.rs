//! Frame encoding for HTTP response bodies
//!
//! Complements the decoding pipeline: `StreamEvent` -> frame bytes.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use std::pin::Pin;

use crate::streaming::frame::encode_frame;
use crate::types::StreamEvent;

/// Byte stream suitable for an HTTP response body.
pub type FrameByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Infallible>> + Send>>;

/// Frame sent when an event cannot be serialized.
const ENCODE_FAILURE_FRAME: &str =
    "data: {\"type\":\"error\",\"data\":\"Failed to encode response frame\"}\n\n";

/// Encode each event as one frame. Serialization never reaches the wire as a
/// raw error: a failed event is replaced by an `error` frame and the stream ends.
pub fn encode_event_stream<S>(events: S) -> FrameByteStream
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    let out = async_stream::stream! {
        futures_util::pin_mut!(events);
        while let Some(event) = events.next().await {
            match encode_frame(&event) {
                Ok(frame) => yield Ok(Bytes::from(frame)),
                Err(e) => {
                    tracing::error!(error = %e, kind = event.kind(), "failed to encode frame");
                    yield Ok(Bytes::from_static(ENCODE_FAILURE_FRAME.as_bytes()));
                    return;
                }
            }
        }
    };
    Box::pin(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::decoder::FrameDecoder;

    #[tokio::test]
    async fn encoded_stream_decodes_back() {
        let events = vec![
            StreamEvent::start("Starting response..."),
            StreamEvent::chunk("Hola "),
            StreamEvent::chunk("🐜"),
            StreamEvent::done("Response complete"),
        ];
        let bytes: Vec<Bytes> = encode_event_stream(futures_util::stream::iter(events.clone()))
            .map(|b| match b {
                Ok(b) => b,
                Err(never) => match never {},
            })
            .collect()
            .await;
        assert_eq!(bytes.len(), 4);

        let mut decoder = FrameDecoder::new();
        let decoded: Vec<StreamEvent> = bytes
            .iter()
            .flat_map(|b| decoder.push(b))
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(decoded, events);
    }

    #[test]
    fn failure_frame_is_a_valid_error_frame() {
        let line = ENCODE_FAILURE_FRAME.trim_end();
        let event = crate::streaming::frame::parse_frame_line(line).unwrap().unwrap();
        assert!(matches!(event, StreamEvent::Error(_)));
    }
}
