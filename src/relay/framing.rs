//! Newline-delimited frame reassembly for the relay stream.
//!
//! The relay protocol frames each JSON envelope with a single `\n`. Stream
//! sockets deliver arbitrary chunk boundaries, so the receive loop feeds raw
//! chunks into a [`FrameBuffer`] and drains complete lines from it; bytes
//! after the last newline stay buffered until the rest of the frame arrives.

use tracing::warn;

/// Maximum size of a single frame (1 MiB) to prevent unbounded buffering
/// when a peer never sends a newline.
const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Accumulates raw stream bytes and yields newline-delimited frames.
///
/// Owned by exactly one receive-loop instance; never shared.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of raw bytes read from the stream.
    ///
    /// If the buffer grows past [`MAX_FRAME_SIZE`] without containing a
    /// newline, the buffered bytes are dropped; the remainder of the
    /// oversized line will decode as garbage and be ignored.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);

        if self.buf.len() > MAX_FRAME_SIZE && !self.buf.contains(&b'\n') {
            warn!(
                "dropping {} buffered bytes: frame exceeds {} bytes without a newline",
                self.buf.len(),
                MAX_FRAME_SIZE
            );
            self.buf.clear();
        }
    }

    /// Remove and return the next complete frame, without its newline.
    ///
    /// Returns `None` when no complete frame is buffered. Non-UTF-8 bytes
    /// are replaced rather than failing the frame; the decoder ignores
    /// lines it cannot use.
    pub fn next_frame(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let frame: Vec<u8> = self.buf.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&frame[..pos]).into_owned())
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn yields_nothing_until_newline_arrives() {
        let mut frames = FrameBuffer::new();
        frames.extend(b"{\"type\":\"command\"");
        assert_eq!(frames.next_frame(), None);

        frames.extend(b",\"command_name\":\"ping\"}\n");
        assert_eq!(
            frames.next_frame(),
            Some("{\"type\":\"command\",\"command_name\":\"ping\"}".to_owned())
        );
        assert_eq!(frames.next_frame(), None);
    }

    #[test]
    fn yields_multiple_frames_from_one_chunk() {
        let mut frames = FrameBuffer::new();
        frames.extend(b"first\nsecond\nthird");

        assert_eq!(frames.next_frame(), Some("first".to_owned()));
        assert_eq!(frames.next_frame(), Some("second".to_owned()));
        assert_eq!(frames.next_frame(), None);
        assert_eq!(frames.pending(), 5);

        frames.extend(b"\n");
        assert_eq!(frames.next_frame(), Some("third".to_owned()));
        assert_eq!(frames.pending(), 0);
    }

    #[test]
    fn frame_split_across_many_chunks_yields_exactly_once() {
        let line = "{\"type\":\"command\",\"command_name\":\"Command_A\",\"parameters\":\"42\"}\n";
        let bytes = line.as_bytes();
        let mut frames = FrameBuffer::new();

        for chunk in bytes.chunks(7) {
            frames.extend(chunk);
        }

        assert_eq!(frames.next_frame(), Some(line.trim_end().to_owned()));
        assert_eq!(frames.next_frame(), None);
    }

    #[test]
    fn empty_line_is_a_frame() {
        let mut frames = FrameBuffer::new();
        frames.extend(b"\n");
        assert_eq!(frames.next_frame(), Some(String::new()));
    }

    #[test]
    fn oversized_line_without_newline_is_dropped() {
        let mut frames = FrameBuffer::new();
        frames.extend(&vec![b'x'; MAX_FRAME_SIZE + 1]);
        assert_eq!(frames.pending(), 0);

        // Subsequent well-formed traffic still parses.
        frames.extend(b"tail-of-oversized\nnext\n");
        assert_eq!(frames.next_frame(), Some("tail-of-oversized".to_owned()));
        assert_eq!(frames.next_frame(), Some("next".to_owned()));
    }
}
