//! Incremental decoder for `data:`-framed event streams.
//!
//! The decoder owns an accumulation buffer. Each call to
//! [`EventDecoder::decode`] appends a chunk, consumes every complete line and
//! keeps the trailing partial line for the next chunk, so the decoded frames
//! do not depend on where the transport split the bytes. Lines are only turned
//! into text once complete, which keeps multi-byte UTF-8 sequences intact.
//!
//! Per line:
//!
//! - blank lines and lines starting with `:` are skipped,
//! - lines without the `data:` marker are ignored,
//! - `data: [DONE]` closes the decoder and everything after it is ignored,
//! - any other payload is parsed as JSON; a payload that does not parse is
//!   kept pending and retried joined with the following line.

use bytes::{Buf, BytesMut};
use serde_json::Value;

use crate::TRACING_TARGET_DECODER;

/// Marker that prefixes every event line.
const DATA_PREFIX: &str = "data:";

/// Payload that signals the end of the stream.
const DONE_SENTINEL: &str = "[DONE]";

/// Upper bound for a pending (not yet parseable) payload.
const MAX_PENDING_BYTES: usize = 64 * 1024;

/// Upper bound for a single unterminated line.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A decoded unit of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Non-empty assistant text.
    Delta(String),
    /// The stream carried an error event.
    Error(String),
    /// The end-of-stream sentinel was received.
    Done,
}

/// Line-framing state machine over an append-only byte stream.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buffer: BytesMut,
    pending: Option<String>,
    closed: bool,
}

impl EventDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a terminal frame has been produced.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Appends a chunk and returns the frames completed by it.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.closed {
            return frames;
        }

        self.buffer.extend_from_slice(chunk);

        while let Some(position) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.split_to(position + 1);
            let line = String::from_utf8_lossy(&line[..position]);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if let Some(frame) = self.decode_line(line) {
                let terminal = !matches!(frame, Frame::Delta(_));
                frames.push(frame);
                if terminal {
                    self.close();
                    return frames;
                }
            }
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            tracing::warn!(
                target: TRACING_TARGET_DECODER,
                buffered_bytes = self.buffer.len(),
                "Discarding oversized unterminated line"
            );
            self.buffer.advance(self.buffer.len());
        }

        frames
    }

    /// Flushes the decoder at the end of the byte stream.
    ///
    /// The residual partial line gets one final parse attempt. Anything that
    /// still does not parse is logged and dropped.
    pub fn finish(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.closed {
            return frames;
        }

        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            let line = String::from_utf8_lossy(&rest);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(frame) = self.decode_line(line) {
                frames.push(frame);
            }
        }

        if let Some(pending) = self.pending.take() {
            tracing::warn!(
                target: TRACING_TARGET_DECODER,
                pending_bytes = pending.len(),
                "Dropping unparseable trailing event data"
            );
        }

        self.close();
        frames
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending = None;
        self.buffer.clear();
    }

    fn decode_line(&mut self, line: &str) -> Option<Frame> {
        if line.starts_with(':') || line.trim().is_empty() {
            return None;
        }

        let payload = data_payload(line);

        let Some(pending) = self.pending.take() else {
            let Some(payload) = payload else {
                tracing::trace!(
                    target: TRACING_TARGET_DECODER,
                    "Ignoring line without data marker"
                );
                return None;
            };
            return self.decode_payload(payload.to_owned());
        };

        // A well-formed event on its own wins over continuing the pending one.
        if let Some(payload) = payload {
            if payload == DONE_SENTINEL {
                abandon(&pending);
                return Some(Frame::Done);
            }
            if let Ok(value) = serde_json::from_str::<Value>(payload) {
                abandon(&pending);
                return interpret(&value);
            }
        }

        let mut joined = pending;
        joined.push('\n');
        joined.push_str(line);
        self.decode_payload(joined)
    }

    fn decode_payload(&mut self, payload: String) -> Option<Frame> {
        if payload == DONE_SENTINEL {
            return Some(Frame::Done);
        }

        match serde_json::from_str::<Value>(&payload) {
            Ok(value) => interpret(&value),
            Err(error) if payload.len() <= MAX_PENDING_BYTES => {
                tracing::debug!(
                    target: TRACING_TARGET_DECODER,
                    error = %error,
                    pending_bytes = payload.len(),
                    "Event payload incomplete, waiting for more data"
                );
                self.pending = Some(payload);
                None
            }
            Err(_) => {
                abandon(&payload);
                None
            }
        }
    }
}

/// Returns the payload of a `data:` line with surrounding whitespace removed.
fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).map(str::trim)
}

fn abandon(pending: &str) {
    tracing::warn!(
        target: TRACING_TARGET_DECODER,
        pending_bytes = pending.len(),
        "Abandoning malformed event data"
    );
}

/// Extracts at most one frame from a parsed event.
fn interpret(value: &Value) -> Option<Frame> {
    if let Some(error) = value.get("error").filter(|error| !error.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string());
        return Some(Frame::Error(message));
    }

    value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(|content| Frame::Delta(content.to_owned()))
}
