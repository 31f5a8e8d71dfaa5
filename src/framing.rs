//! CRLF line framing for the streaming endpoint.
//!
//! Bytes arrive in arbitrary chunks; [`LineFramer`] accumulates them and
//! emits each complete line (without the delimiter) in arrival order. Blank
//! lines are keep-alives and are emitted as empty messages. Decoding to text
//! happens per complete line, so a multi-byte character split across two
//! reads is never mangled.

use bytes::BytesMut;

/// Frame delimiter of the streaming protocol.
pub const DELIMITER: &[u8; 2] = b"\r\n";

/// Incremental CRLF splitter over a growable byte buffer.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
    /// Offset below which the buffer is known to hold no delimiter start.
    scanned: usize,
}

impl LineFramer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity), scanned: 0 }
    }

    /// Append `chunk` and call `emit` once per completed line.
    ///
    /// Returns the number of lines emitted.
    pub fn push<F>(&mut self, chunk: &[u8], mut emit: F) -> usize
    where
        F: FnMut(&str),
    {
        self.buf.extend_from_slice(chunk);

        let mut emitted = 0;
        while let Some(pos) = find_delimiter(&self.buf[self.scanned..]) {
            let end = self.scanned + pos;
            let frame = self.buf.split_to(end + DELIMITER.len());
            emit(&String::from_utf8_lossy(&frame[..end]));
            emitted += 1;
            self.scanned = 0;
        }
        // A trailing CR may pair with an LF from the next chunk.
        self.scanned = self.buf.len().saturating_sub(1);
        emitted
    }

    /// Bytes held back waiting for a delimiter.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack.windows(DELIMITER.len()).position(|w| w == DELIMITER)
}

#[cfg(test)]
#[path = "framing_test.rs"]
mod tests;
