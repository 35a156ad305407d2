//! Incremental decoding of the relayed SSE stream
//!
//! `StreamAccumulator` is the per-request decode state: it reassembles
//! frames from raw byte chunks, extracts delta content, and accumulates
//! the reply text until the terminal token arrives. It is exclusively
//! owned by one request's read loop and discarded when that request
//! settles.

use serde::Deserialize;
use tracing::debug;

use crate::routes::chat::DONE_TOKEN;
use crate::streaming::SseLineBuffer;

/// One streamed completion chunk, reduced to the fields the decoder reads.
#[derive(Debug, Deserialize)]
struct DeltaChunk {
    #[serde(default)]
    choices: Vec<DeltaChoice>,
}

#[derive(Debug, Deserialize)]
struct DeltaChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Accumulates delta content from a relayed SSE stream.
///
/// `full_text` is the ordered concatenation of every non-empty delta seen,
/// in arrival order. Frames that fail to parse are dropped without aborting
/// the stream; the drop count stays observable through `parse_failures`.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    lines: SseLineBuffer,
    full_text: String,
    done: bool,
    parse_failures: u64,
}

impl StreamAccumulator {
    /// Create a fresh accumulator for one request
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw body chunk.
    ///
    /// Frames arriving after the terminal token are ignored; the caller
    /// keeps draining the transport but nothing further accumulates.
    pub fn feed(&mut self, chunk: &[u8]) {
        for line in self.lines.feed(chunk) {
            self.process_frame(&line);
        }
    }

    /// Signal end of stream. Recovers a final frame that arrived without a
    /// trailing newline, then returns the accumulated text.
    pub fn finish(mut self) -> String {
        let tail = self.lines.take_remaining();
        if !tail.is_empty() {
            self.process_frame(&tail);
        }
        self.full_text
    }

    /// True once the terminal token has been observed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.full_text
    }

    /// Number of frames dropped because their payload did not parse.
    pub fn parse_failures(&self) -> u64 {
        self.parse_failures
    }

    fn process_frame(&mut self, line: &str) {
        if self.done {
            return;
        }

        let payload = line.strip_prefix("data: ").unwrap_or(line);
        if payload.is_empty() {
            return;
        }
        if payload == DONE_TOKEN {
            self.done = true;
            return;
        }

        match serde_json::from_str::<DeltaChunk>(payload) {
            Ok(chunk) => {
                if let Some(content) = chunk
                    .choices
                    .first()
                    .and_then(|choice| choice.delta.content.as_deref())
                {
                    if !content.is_empty() {
                        self.full_text.push_str(content);
                    }
                }
            }
            Err(_) => {
                // Malformed frames are dropped, never fatal
                self.parse_failures += 1;
                debug!(frame = %payload, "Dropping unparsable stream frame");
            }
        }
    }
}
