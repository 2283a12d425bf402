//! SSE byte-stream decoding
//!
//! The wire format is `"data: " + JSON + "\n\n"` per event. Network chunks
//! can split an event anywhere, including mid-line and mid-codepoint, so the
//! decoder buffers raw bytes, processes only complete lines, and keeps the
//! trailing incomplete line for the next push. Lines without a `data: `
//! prefix (blank separators, `:` keep-alive comments) are skipped.

use agora_core::TurnEvent;

use crate::error::ClientError;

/// Incremental decoder from raw bytes to [`TurnEvent`]s
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<TurnEvent>, ClientError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            // A complete line never ends inside a codepoint; only incomplete
            // tails can, and those stay in the buffer.
            let line = std::str::from_utf8(&line)
                .map_err(|e| ClientError::Decode(format!("invalid utf-8 in event line: {e}")))?;
            let line = line.trim_end_matches(['\r', '\n']);

            let Some(payload) = line.strip_prefix("data: ") else {
                continue;
            };
            let event = serde_json::from_str(payload)
                .map_err(|e| ClientError::Decode(format!("bad event payload: {e}")))?;
            events.push(event);
        }
        Ok(events)
    }

    /// Bytes still waiting for a line terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
