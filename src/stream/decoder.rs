use tracing::warn;

use crate::types::StreamMessage;

const DATA_PREFIX: &str = "data:";

/// Incremental decoder for `data: <json>` framed streams.
///
/// Bytes may arrive split at any point, including inside a frame or a
/// multi-byte character; only complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Leading bytes of `buffer` already known to hold no newline.
    scanned: usize,
    malformed: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames that were skipped because they did not parse.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Feed one chunk and return every message completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamMessage> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buffer[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            if let Some(message) = self.decode_line(&line) {
                messages.push(message);
            }
            start = end + 1;
            from = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        messages
    }

    /// Decode whatever remains after the stream has ended.
    pub fn finish(&mut self) -> Option<StreamMessage> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        self.scanned = 0;
        self.decode_line(&line)
    }

    fn decode_line(&mut self, line: &str) -> Option<StreamMessage> {
        let line = line.trim_end_matches('\r');
        // Blank separators, comments and non-data fields carry nothing.
        let payload = line.strip_prefix(DATA_PREFIX)?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        if payload.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<StreamMessage>(payload) {
            Ok(message) => Some(message),
            Err(e) => {
                self.malformed += 1;
                warn!(error = %e, frame = %truncate(payload, 120), "Skipping malformed stream frame");
                None
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}
