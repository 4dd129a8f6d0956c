//! Incremental decoder for the line-oriented streaming protocol.
//!
//! Frames are newline-delimited: `data: <json>` carries a completion
//! delta, `info: <json>` carries an out-of-band payload, and the literal
//! `data: [DONE]` terminates the stream. Byte chunks are accumulated in a
//! text buffer and drained line by line; a trailing partial line waits for
//! the next chunk.
//!
//! Event semantics follow the service exactly: an event's `content` is
//! the last non-empty delta observed so far, not an accumulation, and
//! termination re-reports that fragment with `is_final = true`. Empty
//! deltas re-report the previous fragment unchanged.

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::logging::LogGate;
use crate::transport::ByteStream;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;

const DATA_PREFIX: &str = "data: ";
const INFO_PREFIX: &str = "info: ";
const DONE_MARKER: &str = "[DONE]";

/// One decoded content event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// Last non-empty fragment observed so far
    pub content: String,
    /// True exactly once, on termination
    pub is_final: bool,
}

/// A chat response stream.
///
/// May be consumed by exactly one of [`consume`](ChatStream::consume) or
/// [`collect`](ChatStream::collect), exactly once; a second attempt is
/// rejected as invalid use.
pub struct ChatStream {
    inner: Option<ByteStream>,
    gate: Arc<LogGate>,
}

impl ChatStream {
    pub(crate) fn new(inner: ByteStream, gate: Arc<LogGate>) -> Self {
        Self {
            inner: Some(inner),
            gate,
        }
    }

    /// Push mode: decode frames, invoking `on_event` for content and
    /// termination events and `on_info` for out-of-band payloads.
    ///
    /// Malformed frame JSON is logged and skipped; an underlying read
    /// failure aborts decoding and propagates. The reader is released on
    /// every exit path.
    pub async fn consume<E, I>(&mut self, mut on_event: E, mut on_info: I) -> KnowledgeResult<()>
    where
        E: FnMut(&StreamEvent),
        I: FnMut(&Value),
    {
        let mut stream = self.inner.take().ok_or_else(|| {
            KnowledgeError::Stream("stream already consumed".to_string())
        })?;

        let mut buffer = String::new();
        let mut last_fragment = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim_end_matches('\r').to_string();
                buffer.drain(..=newline);

                match self.handle_line(&line, &mut last_fragment, &mut on_event, &mut on_info) {
                    LineOutcome::Continue => {}
                    LineOutcome::Done => return Ok(()),
                }
            }
        }

        // Natural stream end without a [DONE] marker.
        Ok(())
    }

    /// Collect mode: decode to natural completion, concatenating reported
    /// fragments into one value. Out-of-band payloads are dropped.
    pub async fn collect(&mut self) -> KnowledgeResult<String> {
        let mut collected = String::new();
        self.consume(
            |event| {
                if !event.is_final {
                    collected.push_str(&event.content);
                }
            },
            |_| {},
        )
        .await?;
        Ok(collected)
    }

    fn handle_line<E, I>(
        &self,
        line: &str,
        last_fragment: &mut String,
        on_event: &mut E,
        on_info: &mut I,
    ) -> LineOutcome
    where
        E: FnMut(&StreamEvent),
        I: FnMut(&Value),
    {
        if let Some(payload) = line.strip_prefix(INFO_PREFIX) {
            match serde_json::from_str::<Value>(payload) {
                Ok(value) => on_info(&value),
                Err(error) => {
                    self.gate
                        .error(&format!("dropping malformed info frame: {}", error));
                }
            }
            return LineOutcome::Continue;
        }

        if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
            if payload == DONE_MARKER {
                on_event(&StreamEvent {
                    content: last_fragment.clone(),
                    is_final: true,
                });
                return LineOutcome::Done;
            }

            match serde_json::from_str::<Value>(payload) {
                Ok(value) => {
                    if let Some(delta) = first_choice_delta(&value) {
                        if !delta.is_empty() {
                            *last_fragment = delta.to_string();
                        }
                    }
                    // An empty delta re-reports the previous fragment
                    // unchanged rather than resetting it.
                    on_event(&StreamEvent {
                        content: last_fragment.clone(),
                        is_final: false,
                    });
                }
                Err(error) => {
                    self.gate
                        .error(&format!("skipping malformed data frame: {}", error));
                }
            }
            return LineOutcome::Continue;
        }

        // Any other line (keepalives, blank separators) is ignored.
        LineOutcome::Continue
    }
}

enum LineOutcome {
    Continue,
    Done,
}

/// The first choice's delta content, if present
fn first_choice_delta(value: &Value) -> Option<&str> {
    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
}
