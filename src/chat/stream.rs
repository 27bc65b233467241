//! Incremental reader for the streaming chat endpoint.
//!
//! The response body is a sequence of lines of the form
//!
//! ```text
//! data: {"chunk": "Hel", "done": false}
//! data: {"chunk": "lo", "done": false}
//! data: {"done": true}
//! ```
//!
//! [`EventDecoder`] turns arbitrary byte reads into events. Bytes are held
//! until a full line is available, so neither a `data:` line nor a
//! multi-byte character split across two reads changes the result.
//! [`consume`] drives a reader through the decoder and re-renders the
//! accumulated reply into a single message node after every chunk.

use std::io::{ErrorKind, Read};

use serde_json::Value;
use tracing::{debug, warn};

use super::surface::{ChatSurface, MessageId};
use crate::api::ClientError;

/// Prefix that marks an event line.
const DATA_PREFIX: &str = "data: ";

/// Read buffer size.
const READ_CHUNK: usize = 4096;

/// Longest single line the decoder buffers. Anything longer is dropped up to
/// its newline.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// A decoded stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// More reply text.
    Chunk(String),
    /// The server finished the reply.
    Done,
    /// The server aborted the reply.
    Error(String),
}

/// Line framer for `data: <json>` events.
#[derive(Debug, Default)]
pub struct EventDecoder {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline.
    scanned: usize,
    /// Inside an oversized line; skip to its end.
    discarding: bool,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the events completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(rel) = self.pending[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + rel;
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.scanned = 0;
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if let Some(event) = decode_line(&line[..line.len() - 1]) {
                events.push(event);
            }
        }
        self.scanned = self.pending.len();

        if self.scanned > MAX_LINE_BYTES {
            if !self.discarding {
                warn!("dropping stream line longer than {MAX_LINE_BYTES} bytes");
            }
            self.pending.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        events
    }

    /// Flush a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) || self.pending.is_empty() {
            self.pending.clear();
            return Vec::new();
        }
        let line = std::mem::take(&mut self.pending);
        decode_line(&line).into_iter().collect()
    }
}

fn decode_line(bytes: &[u8]) -> Option<StreamEvent> {
    let line = String::from_utf8_lossy(bytes);
    parse_line(line.strip_suffix('\r').unwrap_or(&line))
}

/// Interpret one line. Non-event lines, blank payloads and payloads that
/// are not JSON yield `None`; the last case is logged.
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    if payload.trim().is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!("ignoring malformed stream event ({e}): {payload}");
            return None;
        }
    };

    if let Some(err) = value.get("error").filter(|v| truthy(v)) {
        let message = match err {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Some(StreamEvent::Error(message));
    }

    if value.get("done").is_some_and(truthy) {
        return Some(StreamEvent::Done);
    }

    match value.get("chunk") {
        Some(Value::String(chunk)) if !chunk.is_empty() => Some(StreamEvent::Chunk(chunk.clone())),
        _ => {
            debug!("stream event without content: {payload}");
            None
        }
    }
}

/// JavaScript-style truthiness for event fields.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read `reader` to completion (or until a `done` event), rendering the
/// accumulated reply into node `id` after every chunk.
///
/// Returns the full reply. An error event, a read failure, or a stream that
/// yields no text at all is an error; the caller decides on a fallback.
pub fn consume<R: Read>(
    mut reader: R,
    surface: &mut dyn ChatSurface,
    id: MessageId,
) -> Result<String, ClientError> {
    let mut decoder = EventDecoder::new();
    let mut reply = String::new();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        let events = match reader.read(&mut buf) {
            Ok(0) => {
                apply(decoder.finish(), &mut reply, surface, id)?;
                break;
            }
            Ok(n) => decoder.feed(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ClientError::Transport(e.to_string())),
        };

        if apply(events, &mut reply, surface, id)? {
            break;
        }
    }

    if reply.is_empty() {
        return Err(ClientError::Stream("no content received".to_string()));
    }
    Ok(reply)
}

/// Apply events in order. Returns `Ok(true)` once `done` is seen.
fn apply(
    events: Vec<StreamEvent>,
    reply: &mut String,
    surface: &mut dyn ChatSurface,
    id: MessageId,
) -> Result<bool, ClientError> {
    for event in events {
        match event {
            StreamEvent::Error(msg) => return Err(ClientError::Stream(msg)),
            StreamEvent::Done => return Ok(true),
            StreamEvent::Chunk(chunk) => {
                reply.push_str(&chunk);
                surface.update(id, reply);
            }
        }
    }
    Ok(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::history::Role;
    use crate::chat::surface::HtmlSurface;

    /// A reader that hands out pre-split pieces, one per `read` call.
    struct Pieces {
        pieces: Vec<Vec<u8>>,
    }

    impl Pieces {
        fn new(pieces: &[&[u8]]) -> Self {
            Self {
                pieces: pieces.iter().rev().map(|p| p.to_vec()).collect(),
            }
        }
    }

    impl Read for Pieces {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.pieces.pop() {
                Some(piece) => {
                    let n = piece.len().min(buf.len());
                    buf[..n].copy_from_slice(&piece[..n]);
                    if n < piece.len() {
                        self.pieces.push(piece[n..].to_vec());
                    }
                    Ok(n)
                }
                None => Ok(0),
            }
        }
    }

    fn run(pieces: &[&[u8]]) -> (Result<String, ClientError>, HtmlSurface) {
        let mut surface = HtmlSurface::new();
        let id = surface.append(Role::Assistant, "");
        let result = consume(Pieces::new(pieces), &mut surface, id);
        (result, surface)
    }

    #[test]
    fn parse_line_variants() {
        assert_eq!(
            parse_line(r#"data: {"chunk":"Hi","done":false}"#),
            Some(StreamEvent::Chunk("Hi".to_string()))
        );
        assert_eq!(parse_line(r#"data: {"done":true}"#), Some(StreamEvent::Done));
        assert_eq!(
            parse_line(r#"data: {"error":"model offline"}"#),
            Some(StreamEvent::Error("model offline".to_string()))
        );
        assert_eq!(parse_line(r#"data: {"error":""}"#), None);
        assert_eq!(parse_line(r#"data: {"chunk":"x","done":true}"#), Some(StreamEvent::Done));
        assert_eq!(parse_line("event: ping"), None);
        assert_eq!(parse_line("data: "), None);
        assert_eq!(parse_line("data: {broken"), None);
    }

    #[test]
    fn decoder_joins_lines_split_across_feeds() {
        let mut decoder = EventDecoder::new();
        assert!(decoder.feed(b"data: {\"chu").is_empty());
        assert_eq!(
            decoder.feed(b"nk\":\"ab\"}\ndata: {\"chunk\":\"c\"}\n"),
            vec![StreamEvent::Chunk("ab".to_string()), StreamEvent::Chunk("c".to_string())]
        );
    }

    #[test]
    fn decoder_keeps_split_multibyte_characters() {
        let line = "data: {\"chunk\":\"çay ☕\"}\n".as_bytes();
        let cut = line.iter().position(|&b| b == 0xE2).unwrap() + 1;
        let mut decoder = EventDecoder::new();
        assert!(decoder.feed(&line[..cut]).is_empty());
        assert_eq!(
            decoder.feed(&line[cut..]),
            vec![StreamEvent::Chunk("çay ☕".to_string())]
        );
    }

    #[test]
    fn decoder_flushes_unterminated_tail() {
        let mut decoder = EventDecoder::new();
        assert!(decoder.feed(b"data: {\"done\":true}").is_empty());
        assert_eq!(decoder.finish(), vec![StreamEvent::Done]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn oversized_line_is_dropped_up_to_its_newline() {
        let mut decoder = EventDecoder::new();
        let filler = vec![b'x'; 64 * 1024];
        assert!(decoder.feed(b"data: {\"chunk\":\"").is_empty());
        for _ in 0..(MAX_LINE_BYTES / filler.len() + 2) {
            assert!(decoder.feed(&filler).is_empty());
        }
        assert!(decoder.pending.len() <= MAX_LINE_BYTES);

        assert_eq!(
            decoder.feed(b"\"}\ndata: {\"chunk\":\"ok\"}\n"),
            vec![StreamEvent::Chunk("ok".to_string())]
        );
        assert!(decoder.pending.is_empty());
    }

    #[test]
    fn long_line_in_small_reads_is_scanned_once() {
        let mut decoder = EventDecoder::new();
        decoder.feed(b"data: {\"chunk\":\"");
        for _ in 0..1000 {
            decoder.feed(b"ab");
            assert_eq!(decoder.scanned, decoder.pending.len());
        }
        let events = decoder.feed(b"\"}\n");
        assert_eq!(events, vec![StreamEvent::Chunk("ab".repeat(1000))]);
        assert_eq!(decoder.scanned, 0);
    }

    #[test]
    fn crlf_lines_are_accepted() {
        let mut decoder = EventDecoder::new();
        assert_eq!(
            decoder.feed(b"data: {\"chunk\":\"x\"}\r\n"),
            vec![StreamEvent::Chunk("x".to_string())]
        );
    }

    #[test]
    fn result_independent_of_read_boundaries() {
        let body = b"data: {\"chunk\":\"**Hello\",\"done\":false}\n\
                     data: {\"chunk\":\"** there\",\"done\":false}\n\
                     data: {\"done\":true}\n";

        for split in 1..body.len() {
            let (result, _) = run(&[&body[..split], &body[split..]]);
            assert_eq!(result.unwrap(), "**Hello** there", "split at {split}");
        }

        let bytes: Vec<&[u8]> = body.chunks(1).collect();
        let (result, surface) = run(&bytes);
        assert_eq!(result.unwrap(), "**Hello** there");
        assert_eq!(surface.nodes().len(), 1);
        assert_eq!(surface.nodes()[0].bubble_html, "<strong>Hello</strong> there");
    }

    #[test]
    fn malformed_event_does_not_stop_stream() {
        let (result, _) = run(&[
            b"data: {\"chunk\":\"a\"}\n",
            b"data: {oops\n",
            b"data: {\"chunk\":\"b\"}\n",
            b"data: {\"done\":true}\n",
        ]);
        assert_eq!(result.unwrap(), "ab");
    }

    #[test]
    fn error_event_aborts() {
        let (result, _) = run(&[
            b"data: {\"chunk\":\"a\"}\n",
            b"data: {\"error\":\"Ollama unavailable\"}\n",
            b"data: {\"chunk\":\"b\"}\n",
        ]);
        match result {
            Err(ClientError::Stream(msg)) => assert_eq!(msg, "Ollama unavailable"),
            other => panic!("expected stream error, got {other:?}"),
        }
    }

    #[test]
    fn done_stops_reading() {
        let (result, _) = run(&[
            b"data: {\"chunk\":\"a\"}\ndata: {\"done\":true}\n",
            b"data: {\"chunk\":\"ignored\"}\n",
        ]);
        assert_eq!(result.unwrap(), "a");
    }

    #[test]
    fn end_of_data_without_done_is_success() {
        let (result, _) = run(&[b"data: {\"chunk\":\"tail\"}"]);
        assert_eq!(result.unwrap(), "tail");
    }

    #[test]
    fn empty_stream_is_an_error() {
        let (result, _) = run(&[b"data: {\"done\":true}\n"]);
        assert!(matches!(result, Err(ClientError::Stream(_))));
        let (result, _) = run(&[]);
        assert!(matches!(result, Err(ClientError::Stream(_))));
    }
}
