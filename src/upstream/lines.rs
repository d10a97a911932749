//! Line reassembly for the upstream SSE body.
//!
//! The HTTP client hands out the body as arbitrary byte chunks, which may cut
//! a line (or a multi-byte character) anywhere. [`LineBuffer`] accumulates
//! chunks and only yields complete lines. `\n`, `\r\n` and a lone `\r` all
//! terminate a line, as in the SSE grammar.

use bytes::{Buf, BytesMut};

#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk from the body.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Take the next complete line, without its terminator.
    ///
    /// A `\r` that ends the buffered data is held back until the next chunk
    /// shows whether it is half of a `\r\n`.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self
            .pending
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')?;

        let terminator_len = if self.pending[pos] == b'\n' {
            1
        } else {
            match self.pending.get(pos + 1) {
                Some(b'\n') => 2,
                Some(_) => 1,
                None => return None,
            }
        };

        let line = self.pending.split_to(pos);
        self.pending.advance(terminator_len);
        Some(decode(&line))
    }

    /// Flush whatever is left once the body has ended.
    ///
    /// Call after [`next_line`](Self::next_line) has returned `None`.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut rest = self.pending.split();
        if rest.last() == Some(&b'\r') {
            rest.truncate(rest.len() - 1);
        }
        Some(decode(&rest))
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
