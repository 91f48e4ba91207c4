//! Event-stream parsing for the store subscription.

use std::pin::Pin;

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use serde::Deserialize;
use serde_json::Value;

use super::{StoreError, StoreErrorKind, StoreResult};

/// A single notification on the store's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreStreamEvent {
    /// Replace the data at `path` with `data`.
    Put { path: String, data: Value },
    /// Merge `data` into the children of `path`.
    Patch { path: String, data: Value },
    /// Periodic heartbeat; carries no data.
    KeepAlive,
    /// The server ended the stream.
    Cancel,
    /// The credential used to open the stream is no longer valid.
    AuthRevoked,
}

/// SSE parser that converts a byte stream into `StoreStreamEvent`s.
pub struct SseParser<S> {
    inner: EventStream<S>,
}

impl<S> SseParser<S> {
    pub fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
        }
    }
}

impl<S, E> Stream for SseParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = StoreResult<StoreStreamEvent>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => {
                Poll::Ready(Some(parse_sse_event_fields(&event.event, &event.data)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(StoreError::new(
                StoreErrorKind::Parse,
                format!("SSE stream error: {e}"),
            )))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChangePayload {
    path: String,
    #[serde(default)]
    data: Value,
}

fn parse_sse_event_fields(event_type: &str, data: &str) -> StoreResult<StoreStreamEvent> {
    match event_type {
        "keep-alive" => Ok(StoreStreamEvent::KeepAlive),
        "cancel" => Ok(StoreStreamEvent::Cancel),
        "auth_revoked" => Ok(StoreStreamEvent::AuthRevoked),
        "put" | "patch" => {
            let trimmed = data.trim();
            if trimmed.is_empty() {
                return Err(StoreError::new(
                    StoreErrorKind::Parse,
                    format!("Missing data for {event_type}"),
                ));
            }
            let payload: ChangePayload = serde_json::from_str(trimmed).map_err(|err| {
                StoreError::new(
                    StoreErrorKind::Parse,
                    format!("Failed to parse {event_type}: {err}"),
                )
            })?;
            if event_type == "put" {
                Ok(StoreStreamEvent::Put {
                    path: payload.path,
                    data: payload.data,
                })
            } else {
                Ok(StoreStreamEvent::Patch {
                    path: payload.path,
                    data: payload.data,
                })
            }
        }
        other => Err(StoreError::new(
            StoreErrorKind::Protocol,
            format!("Unknown stream event: {other}"),
        )),
    }
}
