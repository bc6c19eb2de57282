//! Transport-chunk to protocol-frame splitting.
//!
//! The streaming endpoint emits newline-terminated frames, but the transport
//! hands us byte chunks cut at arbitrary positions. `FrameSplitter` buffers the
//! tail of the last incomplete line between chunks so that the yielded lines
//! are identical regardless of how the stream was chunked.

use memchr::memchr;
use tracing::debug;

#[derive(Default)]
pub struct FrameSplitter {
    buffer: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one transport chunk and return every line completed by it, in
    /// arrival order. The trailing partial line stays buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(line) => lines.push(line.trim_end_matches('\r').to_string()),
                Err(err) => {
                    debug!("dropping line with invalid UTF-8: {err}");
                }
            }
            self.buffer.drain(..=newline_pos);
        }
        lines
    }

    /// Consume the splitter at end of stream. The protocol requires frames to
    /// be newline-terminated, so a dangling partial line is discarded.
    pub fn finish(self) {
        if !self.buffer.is_empty() {
            debug!(
                "discarding {} buffered bytes of unterminated frame",
                self.buffer.len()
            );
        }
    }
}

/// Extract the payload of a protocol frame, if the line is one.
///
/// Accepts the `data:` marker with or without a following space, a bare
/// completion token, and the occasional raw JSON object emitted without the
/// marker. Anything else (keep-alives, comments) yields `None` and is ignored.
pub fn frame_payload(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix("data:") {
        return Some(rest.trim_start());
    }
    if line == "[DONE]" || line.starts_with('{') {
        return Some(line);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_bytes(chunks: &[&[u8]]) -> Vec<String> {
        let mut splitter = FrameSplitter::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(splitter.push(chunk));
        }
        splitter.finish();
        lines
    }

    fn collect(chunks: &[&str]) -> Vec<String> {
        let owned: Vec<&[u8]> = chunks.iter().map(|chunk| chunk.as_bytes()).collect();
        collect_bytes(&owned)
    }

    #[test]
    fn yields_lines_in_arrival_order() {
        let lines = collect(&["data: a\ndata: b\n"]);
        assert_eq!(lines, vec!["data: a", "data: b"]);
    }

    #[test]
    fn chunk_boundaries_do_not_affect_output() {
        let stream = b"data: {\"content\":\"Hel\"}\ndata: {\"content\":\"lo\"}\n[DONE]\n";
        let whole = collect_bytes(&[stream.as_slice()]);

        // Re-split the same logical stream at every possible boundary.
        for split_at in 0..stream.len() {
            let (a, b) = stream.split_at(split_at);
            assert_eq!(collect_bytes(&[a, b]), whole, "split at {split_at}");
        }

        // Byte-at-a-time delivery.
        let trickled: Vec<&[u8]> = stream.chunks(1).collect();
        assert_eq!(collect_bytes(&trickled), whole);
    }

    #[test]
    fn partial_line_survives_across_pushes() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(b"data: par").is_empty());
        assert_eq!(splitter.push(b"tial\n"), vec!["data: partial"]);
    }

    #[test]
    fn dangling_partial_line_is_discarded_at_end() {
        let lines = collect(&["data: complete\ndata: cut-off"]);
        assert_eq!(lines, vec!["data: complete"]);
    }

    #[test]
    fn strips_carriage_returns() {
        assert_eq!(collect(&["data: x\r\n"]), vec!["data: x"]);
    }

    #[test]
    fn frame_payload_accepts_marker_variants() {
        assert_eq!(frame_payload("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(frame_payload("data:{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(frame_payload("[DONE]"), Some("[DONE]"));
        assert_eq!(frame_payload("{\"done\": true}"), Some("{\"done\": true}"));
    }

    #[test]
    fn frame_payload_ignores_noise() {
        assert_eq!(frame_payload(""), None);
        assert_eq!(frame_payload(": keep-alive"), None);
        assert_eq!(frame_payload("event: ping"), None);
    }
}
