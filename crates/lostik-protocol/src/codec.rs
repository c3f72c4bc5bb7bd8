//! Streaming line reassembly
//!
//! The serial port hands back whatever bytes arrived before its read
//! time-out, which may be half a reply. The codec buffers fragments until a
//! line feed completes them.

use tracing::warn;

/// Maximum line length kept in the buffer (a 255-byte frame as hex plus marker)
const MAX_LINE_LEN: usize = 600;

/// Streaming LF-terminated line codec
#[derive(Debug, Default)]
pub struct LineCodec {
    buffer: Vec<u8>,
}

impl LineCodec {
    /// Create a new line codec
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(128),
        }
    }

    /// Push raw bytes into the codec's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // A line this long without a terminator is line noise; keep only the tail
        if self.buffer.len() > MAX_LINE_LEN && !self.buffer.contains(&b'\n') {
            warn!(
                "Discarding {} bytes of unterminated input",
                self.buffer.len() - MAX_LINE_LEN
            );
            let excess = self.buffer.len() - MAX_LINE_LEN;
            self.buffer.drain(..excess);
        }
    }

    /// Try to extract the next complete, non-empty line (CR and LF stripped)
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = self.buffer.iter().position(|&b| b == b'\n')?;
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }
}
