//! Shared SSE plumbing for HTTP backends
//!
//! Providers answer with SSE where every `data:` payload is one JSON object.
//! `eventsource-stream` handles UTF-8 boundaries and line buffering; each
//! provider only supplies the function that pulls text out of a payload.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;

use crate::backend::TextStream;
use crate::error::ChatError;

/// Send a streaming request and check the status before streaming starts.
pub(crate) async fn send_streaming_request(
    request: reqwest::RequestBuilder,
    label: &str,
) -> Result<reqwest::Response, ChatError> {
    let response = request
        .send()
        .await
        .map_err(|e| ChatError::Backend(format!("{label} request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ChatError::Backend(format!(
            "{label} API error {}: {}",
            status.as_u16(),
            error_text.trim()
        )));
    }
    Ok(response)
}

/// Turn an SSE response into a stream of text increments.
///
/// - Empty payloads and `done_marker` are skipped / end the stream.
/// - `extract` returns `Ok(None)` for payloads without text.
/// - Any SSE or JSON error is yielded once and ends the stream.
pub(crate) fn sse_text_stream<F>(
    response: reqwest::Response,
    label: &'static str,
    done_marker: Option<&'static str>,
    extract: F,
) -> TextStream
where
    F: Fn(&str) -> Result<Option<String>, ChatError> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut events = response.bytes_stream().eventsource();
        while let Some(item) = events.next().await {
            let event = match item {
                Ok(ev) => ev,
                Err(e) => {
                    yield Err(ChatError::Backend(format!("{label} stream error: {e}")));
                    return;
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if done_marker.is_some_and(|m| m == data) {
                return;
            }

            match extract(data) {
                Ok(Some(text)) => yield Ok(text),
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    };
    Box::pin(out)
}
