//! Incremental SSE frame reader.
//!
//! The reader is fed raw byte chunks exactly as they come off the transport.
//! Chunk boundaries carry no meaning: a chunk may end mid-line or even in the
//! middle of a multi-byte character. Complete lines are decoded and turned
//! into frames; the unterminated tail waits for the next chunk.

use serde_json::Value;
use tracing::debug;

/// Payload of the `data:` line that terminates a stream.
pub const DONE_MARKER: &str = "[DONE]";

/// One dispatched frame: the pending `event:` name and its parsed `data:` JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Per-session frame parser.
///
/// Owns its decode buffer and the pending event type, so each run gets its own
/// reader and concurrent runs never share parsing state.
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: Vec<u8>,
    pending_event: String,
    done: bool,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `data: [DONE]` has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Append a chunk and return every frame completed by it, in order.
    ///
    /// Once `[DONE]` is reached the remaining buffered bytes are discarded and
    /// every later call returns nothing.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.done {
            return frames;
        }

        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            start = end + 1;

            if let Some(frame) = self.handle_line(&line) {
                frames.push(frame);
            }
            if self.done {
                self.buffer.clear();
                return frames;
            }
        }

        self.buffer.drain(..start);
        frames
    }

    /// Flush a final line that was not newline-terminated.
    ///
    /// Call this when the transport closes without a `[DONE]` marker.
    pub fn finish(&mut self) -> Vec<Frame> {
        if self.done || self.buffer.is_empty() {
            self.buffer.clear();
            return Vec::new();
        }

        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        self.handle_line(&line).into_iter().collect()
    }

    fn handle_line(&mut self, raw: &str) -> Option<Frame> {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if let Some(name) = field_value(line, "event") {
            self.pending_event = name.trim().to_string();
            return None;
        }

        let data = field_value(line, "data")?;
        if data.trim() == DONE_MARKER {
            self.done = true;
            return None;
        }

        let payload: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "dropping non-JSON data line");
                return None;
            }
        };

        if self.pending_event.is_empty() {
            debug!("dropping data line without a preceding event line");
            return None;
        }

        Some(Frame {
            event: std::mem::take(&mut self.pending_event),
            data: payload,
        })
    }
}

/// Value of an SSE `field: value` line, with the optional leading space removed.
fn field_value<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(field)?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STREAM: &str = "event: step_start\n\
        data: {\"step_id\":\"a\",\"index\":0}\n\
        \n\
        event: step_stream\n\
        data: {\"step_id\":\"a\",\"content\":\"Grüße\"}\n\
        \n\
        : keep-alive\n\
        event: step_done\n\
        data: {\"step_id\":\"a\",\"output_preview\":\"Grüße\"}\n\
        \n";

    fn read_in_chunks(bytes: &[u8], sizes: &[usize]) -> Vec<Frame> {
        let mut reader = FrameReader::new();
        let mut frames = Vec::new();
        let mut rest = bytes;
        let mut i = 0;
        while !rest.is_empty() {
            let size = sizes[i % sizes.len()].min(rest.len()).max(1);
            let (chunk, tail) = rest.split_at(size);
            frames.extend(reader.push(chunk));
            rest = tail;
            i += 1;
        }
        frames.extend(reader.finish());
        frames
    }

    #[test]
    fn test_reads_frames_in_order() {
        let frames = read_in_chunks(STREAM.as_bytes(), &[usize::MAX]);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].event, "step_start");
        assert_eq!(frames[1], Frame::new("step_stream", json!({"step_id": "a", "content": "Grüße"})));
        assert_eq!(frames[2].event, "step_done");
    }

    #[test]
    fn test_chunk_boundaries_do_not_change_frames() {
        let bytes = STREAM.as_bytes();
        let whole = read_in_chunks(bytes, &[usize::MAX]);

        // Every split point, including ones inside the two-byte 'ü'
        for split in 1..bytes.len() {
            let mut reader = FrameReader::new();
            let mut frames = reader.push(&bytes[..split]);
            frames.extend(reader.push(&bytes[split..]));
            frames.extend(reader.finish());
            assert_eq!(frames, whole, "split at byte {split}");
        }

        assert_eq!(read_in_chunks(bytes, &[1]), whole);
        assert_eq!(read_in_chunks(bytes, &[3, 7, 2]), whole);
    }

    #[test]
    fn test_done_discards_buffered_lines() {
        let mut reader = FrameReader::new();
        let frames = reader.push(
            b"event: step_start\ndata: {\"step_id\":\"a\"}\ndata: [DONE]\nevent: step_done\ndata: {\"step_id\":\"a\"}\nevent: par",
        );

        assert_eq!(frames.len(), 1);
        assert!(reader.is_done());
        assert!(reader.push(b"tial\ndata: {}\n").is_empty());
        assert!(reader.finish().is_empty());
    }

    #[test]
    fn test_non_json_data_is_dropped() {
        let mut reader = FrameReader::new();
        let frames = reader.push(b"event: step_stream\ndata: not json\ndata: {\"content\":\"x\"}\n");

        // The pending event survives the dropped line
        assert_eq!(frames, vec![Frame::new("step_stream", json!({"content": "x"}))]);
    }

    #[test]
    fn test_data_without_event_is_dropped() {
        let mut reader = FrameReader::new();
        let frames = reader.push(b"data: {\"choices\":[]}\nevent: error\ndata: {\"message\":\"boom\"}\ndata: {\"again\":1}\n");

        assert_eq!(frames, vec![Frame::new("error", json!({"message": "boom"}))]);
    }

    #[test]
    fn test_crlf_and_compact_fields() {
        let mut reader = FrameReader::new();
        let frames = reader.push(b"event:step_skip\r\ndata:{\"step_id\":\"b\"}\r\n\r\n");

        assert_eq!(frames, vec![Frame::new("step_skip", json!({"step_id": "b"}))]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut reader = FrameReader::new();
        assert!(reader.push(b"event: workflow_done\ndata: {\"total_steps\":1}").is_empty());

        let frames = reader.finish();
        assert_eq!(frames, vec![Frame::new("workflow_done", json!({"total_steps": 1}))]);
    }
}
