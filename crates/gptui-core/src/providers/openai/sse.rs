//! Decoder for Chat Completions event streams.
//!
//! Event framing is handled by `eventsource-stream`. Each event's `data`
//! carries either a JSON chunk, an `{"error": ...}` object, or the `[DONE]`
//! sentinel. Empty payloads are skipped. The first malformed chunk, provider
//! error or body failure ends the stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use eventsource_stream::{EventStream, EventStreamError, Eventsource};
use futures_util::Stream;
use serde_json::Value;

use super::types::StreamChunk;
use crate::providers::shared::{ChatError, ChatResult};
use crate::transport::{TransportError, TransportErrorKind};

const DONE_SENTINEL: &str = "[DONE]";

/// Appends a blank line at body end so a final event without a trailing
/// newline is still dispatched.
struct SseTerminatedStream<S> {
    inner: S,
    emitted_terminator: bool,
}

impl<S> SseTerminatedStream<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            emitted_terminator: false,
        }
    }
}

impl<S, E> Stream for SseTerminatedStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.emitted_terminator {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(None) => {
                self.emitted_terminator = true;
                Poll::Ready(Some(Ok(Bytes::from_static(b"\n\n"))))
            }
            other => other,
        }
    }
}

/// Result of decoding one event payload.
enum Payload {
    Skip,
    Chunk(StreamChunk),
    Done,
}

fn parse_payload(data: &str) -> ChatResult<Payload> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(Payload::Skip);
    }
    if data == DONE_SENTINEL {
        return Ok(Payload::Done);
    }

    let value: Value = serde_json::from_str(data).map_err(|e| ChatError::decode(&e))?;
    // Providers report mid-stream failures as an error object on a 200 response
    if value.get("error").is_some() {
        return Err(ChatError::http_status(200, data));
    }
    serde_json::from_value(value)
        .map(Payload::Chunk)
        .map_err(|e| ChatError::decode(&e))
}

fn map_stream_error(err: EventStreamError<TransportError>) -> ChatError {
    match err {
        EventStreamError::Transport(err) => ChatError::Transport(err),
        other => ChatError::Transport(TransportError::new(
            TransportErrorKind::Body,
            format!("SSE stream error: {other}"),
        )),
    }
}

/// Adapts a body byte stream into decoded [`StreamChunk`]s.
pub struct SseDataStream<S> {
    inner: EventStream<SseTerminatedStream<S>>,
    finished: bool,
}

impl<S> SseDataStream<S>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner: SseTerminatedStream::new(inner).eventsource(),
            finished: false,
        }
    }
}

impl<S> Stream for SseDataStream<S>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    type Item = ChatResult<StreamChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => match parse_payload(&event.data) {
                    Ok(Payload::Skip) => {}
                    Ok(Payload::Chunk(chunk)) => return Poll::Ready(Some(Ok(chunk))),
                    Ok(Payload::Done) => {
                        tracing::debug!("stream sentinel received");
                        self.finished = true;
                    }
                    Err(err) => {
                        self.finished = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                },
                Poll::Ready(Some(Err(err))) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(map_stream_error(err))));
                }
                Poll::Ready(None) => self.finished = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
