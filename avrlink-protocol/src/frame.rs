//! Line framing.
//!
//! The receiver terminates every status line with a single carriage return.
//! [`LineFramer`] buffers raw bytes from the transport and hands out complete
//! lines, keeping any partial trailing data until its terminator arrives.

use crate::EOL;
use bytes::BytesMut;

/// Initial capacity of the framing buffer. Lines are short, but the buffer
/// grows as needed; no line-length limit is imposed.
const INITIAL_CAPACITY: usize = 1024;

/// Splits a byte stream into CR-terminated lines.
///
/// One framer is used per connection; call [`LineFramer::clear`] (or create a
/// new one) when the transport is replaced.
#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Appends data read from the transport.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the next complete line, without its terminator.
    ///
    /// Empty lines are skipped. Returns `None` when no terminator is buffered.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = self.buffer.iter().position(|&b| b == EOL)?;
            let line = self.buffer.split_to(pos + 1);
            let content = &line[..pos];
            if !content.is_empty() {
                return Some(String::from_utf8_lossy(content).into_owned());
            }
        }
    }

    /// Drains the buffer at end of stream.
    ///
    /// Any unterminated trailing data is returned as a final line.
    pub fn finish(&mut self) -> Option<String> {
        if let Some(line) = self.next_line() {
            return Some(line);
        }
        if self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        Some(String::from_utf8_lossy(&rest).into_owned())
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects every complete line currently buffered.
impl Iterator for LineFramer {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_line()
    }
}
