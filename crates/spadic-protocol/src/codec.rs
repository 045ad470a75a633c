//! Newline framing for the JSON request stream.
//!
//! Bytes arrive in arbitrarily sized chunks. [`LineDecoder`] buffers them,
//! cuts complete lines at `\n` and decodes each line as one JSON value.
//! Lines that are not valid JSON are dropped without disturbing the lines
//! that follow, so a noisy client cannot poison its own connection.

use serde_json::Value;
use tracing::debug;

const CODEC_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::codec");

/// Default bound on a single line, excluding the terminating newline.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental decoder for line-delimited JSON.
///
/// A decoder holds the partial line of one connection; use a fresh decoder
/// for every connection.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` known to contain no newline.
    scanned: usize,
    max_line_bytes: usize,
    /// Set while skipping the remainder of an oversized line.
    discarding: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    /// Creates a decoder with the default line bound.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_line_bytes(DEFAULT_MAX_LINE_BYTES)
    }

    /// Creates a decoder that drops lines longer than `max_line_bytes`.
    #[must_use]
    pub const fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line_bytes,
            discarding: false,
        }
    }

    /// Appends received bytes to the pending input.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Decodes the next complete line, skipping lines that fail to parse.
    ///
    /// Returns `None` once no complete line remains buffered.
    pub fn next_message(&mut self) -> Option<Value> {
        loop {
            let line = self.take_line()?;
            if line.len() > self.max_line_bytes {
                debug!(
                    target: CODEC_TARGET,
                    length = line.len(),
                    limit = self.max_line_bytes,
                    "dropping oversized line"
                );
                continue;
            }
            match serde_json::from_slice::<Value>(&line) {
                Ok(value) => return Some(value),
                Err(error) => {
                    debug!(target: CODEC_TARGET, %error, "dropping undecodable line");
                }
            }
        }
    }

    /// Iterates over every message decodable from the buffered input.
    pub const fn messages(&mut self) -> Messages<'_> {
        Messages { decoder: self }
    }

    /// Number of bytes waiting for a newline.
    #[must_use]
    pub const fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Removes the next complete line (without its newline) from the buffer.
    fn take_line(&mut self) -> Option<Vec<u8>> {
        loop {
            let pending = self.buffer.get(self.scanned..).unwrap_or_default();
            let Some(offset) = pending.iter().position(|byte| *byte == b'\n') else {
                self.scanned = self.buffer.len();
                if self.buffer.len() > self.max_line_bytes {
                    debug!(
                        target: CODEC_TARGET,
                        buffered = self.buffer.len(),
                        limit = self.max_line_bytes,
                        "discarding oversized partial line"
                    );
                    self.buffer.clear();
                    self.scanned = 0;
                    self.discarding = true;
                }
                return None;
            };

            let end = self.scanned + offset;
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            line.pop();
            self.scanned = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            return Some(line);
        }
    }
}

/// Iterator returned by [`LineDecoder::messages`].
#[derive(Debug)]
pub struct Messages<'a> {
    decoder: &'a mut LineDecoder,
}

impl Iterator for Messages<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_message()
    }
}
