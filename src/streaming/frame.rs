//! Frame contract
//!
//! One frame per event: `data: {"type":...,"data":...}` followed by a blank
//! line. Both sides of the transport go through this module so the wire
//! format is defined in exactly one place.

use crate::error::ChatError;
use crate::types::StreamEvent;

/// Marker every frame line starts with.
pub const FRAME_PREFIX: &str = "data: ";

/// Delimiter closing a frame.
pub const FRAME_DELIMITER: &str = "\n\n";

/// Encode an event as one complete frame.
pub fn encode_frame(event: &StreamEvent) -> Result<String, ChatError> {
    let payload = serde_json::to_string(event)?;
    Ok(format!("{FRAME_PREFIX}{payload}{FRAME_DELIMITER}"))
}

/// Parse one line of the stream.
///
/// Returns `None` for anything that is not a frame (blank lines, comments,
/// stray text, a prefix with nothing after it). A frame whose payload fails
/// to parse yields `Some(Err(ChatError::FrameParse))`.
pub fn parse_frame_line(line: &str) -> Option<Result<StreamEvent, ChatError>> {
    let payload = line.strip_prefix(FRAME_PREFIX)?.trim();
    if payload.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<StreamEvent>(payload)
            .map_err(|e| ChatError::FrameParse(format!("{e} in frame `{payload}`"))),
    )
}
