//! Incremental server-sent-events decoding.
//!
//! Contract:
//! - `SseDecoder` accepts raw byte chunks exactly as they arrive from a
//!   response body and emits an event per blank-line delimiter, however the
//!   chunks were split. Partial lines, partial delimiters, and multi-byte
//!   characters spanning a chunk boundary are buffered, never dropped or
//!   duplicated.
//! - A decoder is stateful per HTTP response and discarded with it.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::BytesMut;
use futures_util::stream::Stream;

use crate::error::{BridgeError, CoreResult};

/// One fully assembled event from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The `event:` field, if the server named one.
    pub event: Option<String>,
    /// Concatenated `data:` payload; multi-line payloads are joined with `\n`.
    pub data: String,
}

/// Stateful SSE framing decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    event_type: Option<String>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk; returns every event completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(idx) = self.buf.iter().position(|&b| b == b'\n') {
            let raw = self.buf.split_to(idx + 1);
            let mut end = raw.len() - 1;
            if end > 0 && raw[end - 1] == b'\r' {
                end -= 1;
            }
            // Complete lines never split a multi-byte sequence, so lossy
            // decoding here only replaces genuinely invalid bytes.
            let line = String::from_utf8_lossy(&raw[..end]).into_owned();
            self.take_line(&line, &mut out);
        }
        out
    }

    /// Flush a trailing block the server closed without a final blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buf.is_empty() {
            let raw = self.buf.split();
            let line = String::from_utf8_lossy(&raw).into_owned();
            let mut out = Vec::new();
            self.take_line(&line, &mut out);
        }
        if self.data_lines.is_empty() {
            self.event_type = None;
            return None;
        }
        Some(SseEvent {
            event: self.event_type.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
        })
    }

    fn take_line(&mut self, line: &str, out: &mut Vec<SseEvent>) {
        if line.is_empty() {
            // Blank line completes the pending block; blocks with no data
            // payload are discarded per the framing rules.
            if !self.data_lines.is_empty() {
                out.push(SseEvent {
                    event: self.event_type.take(),
                    data: std::mem::take(&mut self.data_lines).join("\n"),
                });
            } else {
                self.event_type = None;
            }
            return;
        }
        if line.starts_with(':') {
            return; // comment line
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "data" => self.data_lines.push(value.to_string()),
            "event" => self.event_type = Some(value.to_string()),
            // id: / retry: values are not used by this application
            _ => {}
        }
    }
}

/// Boxed stream of decoded events; what `HttpClient::post_event_stream` returns.
pub type EventStream = futures::stream::BoxStream<'static, CoreResult<SseEvent>>;

type BodyStream =
    Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>;

/// Adapter that owns a response byte stream and yields decoded events lazily.
/// A transport error mid-body surfaces as one `Err` item and ends the stream.
pub struct DecodeStream {
    inner: BodyStream,
    decoder: SseDecoder,
    ready: VecDeque<SseEvent>,
    done: bool,
}

impl DecodeStream {
    pub fn new(inner: BodyStream) -> Self {
        Self {
            inner,
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }
}

impl Stream for DecodeStream {
    type Item = CoreResult<SseEvent>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(ev) = self.ready.pop_front() {
                return Poll::Ready(Some(Ok(ev)));
            }
            if self.done {
                return Poll::Ready(None);
            }
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let events = self.decoder.feed(&chunk);
                    self.ready.extend(events);
                    continue;
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(BridgeError::network(format!(
                        "stream read failed: {e}"
                    )))));
                }
                Poll::Ready(None) => {
                    self.done = true;
                    if let Some(ev) = self.decoder.finish() {
                        return Poll::Ready(Some(Ok(ev)));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
