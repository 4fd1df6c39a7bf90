//! Minimal server-sent-events decoder for task streams.
//!
//! The backend only uses `data:` lines, one JSON document per event,
//! with events separated by a blank line. Comment lines (`:`) and other
//! SSE fields are ignored.

/// Incremental decoder fed with raw response chunks.
///
/// Chunks can split events, lines and even UTF-8 sequences arbitrarily;
/// the decoder buffers until a full event is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the data payloads of all events completed
    /// by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(end) = find_event_boundary(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..end.total).collect();
            let raw = String::from_utf8_lossy(&event[..end.body]);
            if let Some(data) = extract_data(&raw) {
                payloads.push(data);
            }
        }
        payloads
    }
}

struct EventBoundary {
    /// Length of the event body, excluding the separator.
    body: usize,
    /// Length including the separator, i.e. how much to drain.
    total: usize,
}

fn find_event_boundary(buffer: &[u8]) -> Option<EventBoundary> {
    // Events end at the first blank line: \n\n or \r\n\r\n.
    let mut i = 0;
    while i < buffer.len() {
        if buffer[i..].starts_with(b"\n\n") {
            return Some(EventBoundary {
                body: i,
                total: i + 2,
            });
        }
        if buffer[i..].starts_with(b"\r\n\r\n") {
            return Some(EventBoundary {
                body: i,
                total: i + 4,
            });
        }
        i += 1;
    }
    None
}

/// Joins the `data:` lines of one event, per the SSE spec.
fn extract_data(event: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in event.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
