//! Frame decoding from raw body bytes
//!
//! bytes -> [`Utf8StreamDecoder`] -> [`LineBuffer`] -> [`parse_frame_line`].
//! Each stage keeps its own incomplete tail, so event boundaries never depend
//! on how the transport happened to chunk the body.

use futures_util::{Stream, StreamExt};
use std::pin::Pin;

use crate::error::ChatError;
use crate::streaming::frame::parse_frame_line;
use crate::streaming::utf8_decoder::Utf8StreamDecoder;
use crate::types::StreamEvent;

/// Accumulates text and hands out complete lines.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    buf: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` and drain every complete line. The incomplete remainder
    /// stays buffered. A trailing `\r` is removed from each line.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buf.push_str(text);
        let Some(last_newline) = self.buf.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.buf.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buf, rest);
        complete
            .split_terminator('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect()
    }

    /// Text received after the last newline.
    pub fn remainder(&self) -> &str {
        &self.buf
    }
}

/// Stateful decoder turning body chunks into stream events.
#[derive(Debug, Default, Clone)]
pub struct FrameDecoder {
    utf8: Utf8StreamDecoder,
    lines: LineBuffer,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes and return the events completed by it, in order.
    ///
    /// Malformed frames come back as `Err(ChatError::FrameParse)` items; the
    /// decoder state is unaffected by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, ChatError>> {
        let text = self.utf8.decode(chunk);
        if text.is_empty() {
            return Vec::new();
        }
        self.lines
            .push(&text)
            .iter()
            .filter_map(|line| parse_frame_line(line))
            .collect()
    }

    /// Text received after the last complete line.
    pub fn unterminated(&self) -> &str {
        self.lines.remainder()
    }

    /// Drain everything still buffered at end of body, undecodable bytes
    /// included. Never parsed as a frame.
    pub fn finish(&mut self) -> String {
        let mut rest = std::mem::take(&mut self.lines.buf);
        rest.push_str(&self.utf8.finish());
        rest
    }
}

/// Stream of decoded events, including per-frame parse errors.
pub type FrameEventStream =
    Pin<Box<dyn Stream<Item = Result<StreamEvent, ChatError>> + Send + 'static>>;

/// Decode a body byte stream into events.
///
/// Parse errors are yielded as items and decoding continues; a transport
/// error is yielded and ends the stream.
pub fn decode_frames<S, B>(byte_stream: S) -> FrameEventStream
where
    S: Stream<Item = Result<B, ChatError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        futures_util::pin_mut!(byte_stream);
        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for item in decoder.push(chunk.as_ref()) {
                yield item;
            }
        }
        let rest = decoder.finish();
        if !rest.trim().is_empty() {
            tracing::debug!(remainder = %rest, "body ended inside a line; discarding");
        }
    };
    Box::pin(out)
}
