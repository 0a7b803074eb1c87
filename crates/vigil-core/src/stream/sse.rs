//! Incremental SSE frame parser.

use bytes::BytesMut;

/// One completed SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// Value of the `event:` field, if the frame had one.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Parses an SSE byte stream delivered in arbitrary chunks.
///
/// Bytes after the last newline are carried over to the next
/// [`feed`](Self::feed) call, so frames and even single lines may be split
/// anywhere.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: BytesMut,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            let line = String::from_utf8_lossy(&line[..pos]);
            if let Some(event) = self.process_line(line.strip_suffix('\r').unwrap_or(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Drain state at end of stream.
    ///
    /// An unterminated trailing line is processed as if it had a newline,
    /// then any pending frame is emitted.
    pub fn flush(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.buf.is_empty() {
            let rest = self.buf.split();
            let line = String::from_utf8_lossy(&rest);
            if let Some(event) = self.process_line(line.strip_suffix('\r').unwrap_or(&line)) {
                events.push(event);
            }
        }
        if let Some(event) = self.take_pending() {
            events.push(event);
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<StreamEvent> {
        if line.is_empty() {
            return self.take_pending();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // `id:` and `retry:` carry nothing we extract.
            _ => {}
        }
        None
    }

    fn take_pending(&mut self) -> Option<StreamEvent> {
        if self.data.is_empty() && self.event.is_none() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(StreamEvent {
            event: self.event.take(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: foo\n").is_empty());
        let events = parser.feed(b"\n");
        assert_eq!(
            events,
            vec![StreamEvent {
                event: None,
                data: "foo".to_string()
            }]
        );
    }

    #[test]
    fn test_flush_emits_unterminated_data_line() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: bar").is_empty());
        let events = parser.flush();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "bar");
        assert!(parser.flush().is_empty());
    }

    #[test]
    fn test_event_name_and_multiline_data() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"event: message_delta\r\ndata: {\"a\":\r\ndata: 1}\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message_delta"));
        assert_eq!(events[0].data, "{\"a\":\n1}");
    }

    #[test]
    fn test_line_split_mid_token() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"da").is_empty());
        assert!(parser.feed(b"ta:no-space").is_empty());
        let events = parser.feed(b"\n\ndata: second\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "no-space");
        assert_eq!(events[1].data, "second");
    }

    #[test]
    fn test_comments_are_ignored() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keep-alive\n\n: ping\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }
}
