//! Incremental parsing of `data:` lines from an SSE response body.
//!
//! Chunks arrive at arbitrary byte boundaries, which can fall inside a line
//! or even inside a multi-byte character, so the carryover is kept as raw
//! bytes and only complete lines are decoded.

use crate::errors::TransportError;
use crate::providers::base::StreamEvent;

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the body, returning the events it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, TransportError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=end).collect();
            let decoded = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = decoded.trim_end_matches('\r');

            // Skip blank separators and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(data) = line.strip_prefix("data: ") {
                // End-of-stream marker; termination is observed at body EOF
                if data == "[DONE]" {
                    continue;
                }
                let event = serde_json::from_str::<StreamEvent>(data)
                    .map_err(|e| TransportError::Malformed(format!("{}: {}", e, data)))?;
                events.push(event);
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deltas(events: Vec<StreamEvent>) -> Vec<String> {
        events
            .into_iter()
            .filter_map(|e| match e {
                StreamEvent::OutputTextDelta { delta } => Some(delta),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_whole_events_parse() {
        let mut parser = SseParser::new();
        let events = parser
            .push(b"data: {\"type\":\"response.output_text.delta\",\"delta\":\"Hi\"}\n\n")
            .unwrap();
        assert_eq!(deltas(events), vec!["Hi"]);
    }

    #[test]
    fn test_partial_lines_carry_over() {
        let mut parser = SseParser::new();
        let first = parser
            .push(b"data: {\"type\":\"response.output_text.del")
            .unwrap();
        assert!(first.is_empty());
        let second = parser.push(b"ta\",\"delta\":\"Hello\"}\n").unwrap();
        assert_eq!(deltas(second), vec!["Hello"]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let mut parser = SseParser::new();
        let line = "data: {\"type\":\"response.output_text.delta\",\"delta\":\"المادة\"}\n".as_bytes();
        // Cut inside the first two-byte Arabic character
        let split = line.iter().position(|&b| b >= 0x80).unwrap() + 1;
        let first = parser.push(&line[..split]).unwrap();
        assert!(first.is_empty());
        let second = parser.push(&line[split..]).unwrap();
        assert_eq!(deltas(second), vec!["المادة"]);
    }

    #[test]
    fn test_done_marker_and_comments_are_skipped() {
        let mut parser = SseParser::new();
        let events = parser
            .push(b": keep-alive\ndata: [DONE]\n\n")
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_events_keep_arrival_order() {
        let mut parser = SseParser::new();
        let body = concat!(
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"a\"}\n\n",
            "data: {\"type\":\"response.output_text.delta\",\"delta\":\"b\"}\n\n",
            "data: {\"type\":\"response.completed\"}\n\n",
        );
        let events = parser.push(body.as_bytes()).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(deltas(events), vec!["a", "b"]);
    }

    #[test]
    fn test_garbage_payload_is_malformed() {
        let mut parser = SseParser::new();
        let result = parser.push(b"data: not-json\n");
        assert!(matches!(result, Err(TransportError::Malformed(_))));
    }
}
