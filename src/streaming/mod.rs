//! SSE (Server-Sent Events) stream reassembly
//!
//! Response bodies arrive as byte chunks that align with neither line
//! boundaries nor UTF-8 character boundaries. The types here carry both
//! kinds of partial state across chunks so callers only ever see whole,
//! correctly decoded lines.

/// Incremental UTF-8 decoder.
///
/// An incomplete multi-byte sequence at the end of a chunk is retained and
/// joined with the next chunk; decoding each chunk independently would turn
/// a split character into replacement characters. Truly invalid bytes still
/// decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    /// Create a new decoder with no carried state
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, returning all text that is complete so far.
    pub fn feed(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // `valid_up_to` guarantees this prefix is valid UTF-8
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let carry = rest.to_vec();
        self.pending = carry;
        out
    }

    /// True if a partial multi-byte sequence is still buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Buffer for reassembling complete SSE lines from arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    decoder: Utf8StreamDecoder,
    /// Decoded text of the current, not-yet-terminated line
    partial_line: String,
}

impl SseLineBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the buffer and return any complete lines.
    ///
    /// Complete lines are those terminated by `\n`; the newline (and a
    /// preceding `\r`, if any) is stripped. Empty lines are dropped since
    /// SSE uses blank lines as event separators.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let decoded = self.decoder.feed(bytes);
        self.partial_line.push_str(&decoded);

        let mut lines = Vec::new();
        while let Some(newline_pos) = self.partial_line.find('\n') {
            let rest = self.partial_line.split_off(newline_pos + 1);
            let mut line = std::mem::replace(&mut self.partial_line, rest);
            line.truncate(line.len() - 1);
            if line.ends_with('\r') {
                line.truncate(line.len() - 1);
            }
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// True if a partial line or partial character is still buffered.
    /// Useful for detecting truncated streams at end of response.
    pub fn has_incomplete(&self) -> bool {
        !self.partial_line.is_empty() || self.decoder.has_pending()
    }

    /// The decoded text of the unterminated trailing line, if any.
    pub fn remaining(&self) -> &str {
        &self.partial_line
    }

    /// Take the unterminated trailing line, leaving the buffer empty.
    /// Called at end of stream to recover a final line with no newline.
    pub fn take_remaining(&mut self) -> String {
        std::mem::take(&mut self.partial_line)
    }
}
