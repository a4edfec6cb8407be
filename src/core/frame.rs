//! Line framing for streaming message responses.
//!
//! The body is a sequence of `data: <json>` lines. Reads arrive in arbitrary
//! sizes, so the decoder keeps the unterminated tail of each read and joins it
//! with the next one. Bytes are buffered rather than text so a multi-byte
//! character split across reads still decodes.

use memchr::memchr;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::StreamEvent;

const DATA_PREFIX: &str = "data:";

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    skipped: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read from the transport and drain every complete event.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(relative) = memchr(b'\n', &self.buffer[start..]) {
            let newline = start + relative;
            if let Some(event) = self.decode_line(start, newline) {
                events.push(event);
            }
            start = newline + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        events
    }

    /// Flush the trailing partial line once the transport has closed.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let end = self.buffer.len();
        let event = self.decode_line(0, end);
        self.buffer.clear();
        event.into_iter().collect()
    }

    /// Number of lines dropped because their payload was not valid JSON.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn has_pending(&self) -> bool {
        !self.buffer.iter().all(u8::is_ascii_whitespace)
    }

    fn decode_line(&mut self, start: usize, end: usize) -> Option<StreamEvent> {
        let line = match std::str::from_utf8(&self.buffer[start..end]) {
            Ok(text) => text.trim(),
            Err(err) => {
                warn!("Skipping stream line with invalid UTF-8: {err}");
                self.skipped += 1;
                return None;
            }
        };

        let payload = data_payload(line)?;
        if payload.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => Some(StreamEvent::from_value(value)),
            Err(err) => {
                warn!("Skipping malformed stream frame: {err}");
                debug!(payload, "malformed frame payload");
                self.skipped += 1;
                None
            }
        }
    }
}

pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).map(str::trim)
}

/// Decode a complete body in one pass.
pub fn decode_all(body: &[u8]) -> Vec<StreamEvent> {
    let mut decoder = FrameDecoder::new();
    let mut events = decoder.push(body);
    events.extend(decoder.finish());
    events
}
