// src/util/io/frame.rs
//! Line framer - splits the serial byte stream into newline-terminated records

/// Accumulates raw chunks and yields complete, trimmed, non-empty lines.
///
/// Bytes after the last `\n` stay buffered until a later chunk terminates
/// them. Lines are decoded as UTF-8 only once complete, so a multi-byte
/// character split across two reads is reassembled intact.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it finishes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
            start = end + 1;
        }

        self.buffer.drain(..start);
        lines
    }

    /// Bytes received after the last newline.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard the undelimited remainder; returns how many bytes were dropped.
    pub fn finish(self) -> usize {
        self.buffer.len()
    }
}
