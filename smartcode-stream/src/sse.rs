//! Incremental `text/event-stream` decoder.
//!
//! Bytes are fed in whatever chunks the transport delivers; complete
//! frames come out. Line endings may be LF, CRLF or CR, and a chunk may
//! end anywhere, including in the middle of a UTF-8 sequence or between
//! the CR and LF of one line ending.
//!
//! ```text
//! event: test-update\n
//! data: {"testName":"loginTest","status":"PASS","message":"ok"}\n
//! \n                                   ◀── blank line dispatches
//! ```

use std::time::Duration;

const BOM: &[u8] = b"\xEF\xBB\xBF";
const DEFAULT_EVENT: &str = "message";

/// One dispatched event-stream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name; `message` when the frame carried no `event:` field.
    pub event: String,
    /// `data:` lines joined with `\n`.
    pub data: String,
    /// Last event id seen on the stream at dispatch time.
    pub id: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    after_cr: bool,
    started: bool,

    event: String,
    data: String,
    has_data: bool,

    last_event_id: Option<String>,
    retry: Option<Duration>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        for &byte in chunk {
            if self.after_cr {
                self.after_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\r' => {
                    self.after_cr = true;
                    self.end_line(&mut frames);
                }
                b'\n' => self.end_line(&mut frames),
                _ => self.line.push(byte),
            }
        }
        frames
    }

    /// Reconnection delay last announced by the server.
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    fn end_line(&mut self, frames: &mut Vec<SseFrame>) {
        let mut raw = std::mem::take(&mut self.line);
        if !self.started {
            self.started = true;
            if raw.starts_with(BOM) {
                raw.drain(..BOM.len());
            }
        }

        if raw.is_empty() {
            if let Some(frame) = self.dispatch() {
                frames.push(frame);
            }
            return;
        }

        let line = String::from_utf8_lossy(&raw);
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.find(':') {
            Some(pos) => {
                let value = &line[pos + 1..];
                (&line[..pos], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (&line[..], ""),
        };

        match field {
            "event" => self.event = value.to_string(),
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "id" => {
                if !value.contains('\0') {
                    self.last_event_id = Some(value.to_string());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.retry = Some(Duration::from_millis(ms));
                    }
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = std::mem::take(&mut self.event);
        let data = std::mem::take(&mut self.data);
        if !std::mem::take(&mut self.has_data) {
            return None;
        }
        Some(SseFrame {
            event: if event.is_empty() { DEFAULT_EVENT.to_string() } else { event },
            data,
            id: self.last_event_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_named_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"event: test-update\ndata: {\"a\":1}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "test-update".into(),
                data: "{\"a\":1}".into(),
                id: None,
            }]
        );
    }

    #[test]
    fn test_default_event_name() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: hello\n\n");
        assert_eq!(frames[0].event, "message");
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: one\ndata: two\ndata:three\n\n");
        assert_eq!(frames[0].data, "one\ntwo\nthree");
    }

    #[test]
    fn test_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: test-up").is_empty());
        assert!(decoder.feed(b"date\nda").is_empty());
        assert!(decoder.feed(b"ta: x\n").is_empty());
        let frames = decoder.feed(b"\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "test-update");
        assert_eq!(frames[0].data, "x");
    }

    #[test]
    fn test_split_utf8_sequence() {
        let text = "data: caf\u{e9}\n\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&text[..split]).is_empty());
        let frames = decoder.feed(&text[split..]);
        assert_eq!(frames[0].data, "caf\u{e9}");
    }

    #[test]
    fn test_crlf_and_cr_line_endings() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: a\r\n\r\ndata: b\r\rdata: c\r");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "a");
        assert_eq!(frames[1].data, "b");
        // CR then LF in the next chunk is one line ending
        assert_eq!(decoder.feed(b"\n").len(), 0);
        assert_eq!(decoder.feed(b"\n")[0].data, "c");
    }

    #[test]
    fn test_comments_and_unknown_fields_ignored() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": keep-alive\nfoo: bar\ndata: x\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "x");
    }

    #[test]
    fn test_comment_only_block_not_dispatched() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b": ping\n\n").is_empty());
        assert!(decoder.feed(b"event: test-update\n\n").is_empty());
        // the event name does not leak into the next frame
        assert_eq!(decoder.feed(b"data: y\n\n")[0].event, "message");
    }

    #[test]
    fn test_id_and_retry() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"id: 42\nretry: 3000\ndata: x\n\nretry: soon\n");
        assert_eq!(frames[0].id.as_deref(), Some("42"));
        assert_eq!(decoder.last_event_id(), Some("42"));
        assert_eq!(decoder.retry(), Some(Duration::from_millis(3000)));
    }

    #[test]
    fn test_id_with_nul_ignored() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"id: a\0b\ndata: x\n\n");
        assert_eq!(decoder.last_event_id(), None);
    }

    #[test]
    fn test_bom_stripped() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"\xEF\xBB\xBFevent: e\ndata: x\n\n");
        assert_eq!(frames[0].event, "e");
    }

    #[test]
    fn test_field_without_colon() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "");
    }

    #[test]
    fn test_unterminated_frame_not_dispatched() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: partial\n").is_empty());
    }
}
