//! SSE client transport.
//!
//! The server pushes frames over a long-lived `GET {base}/sse` event stream.
//! Its first event, `endpoint`, names the URL the client POSTs its own
//! frames to. Every later `message` event carries one JSON-RPC frame.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::error::McpError;
use crate::transport::McpTransport;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type; `message` when the server sent no `event:` field.
    pub event: String,
    pub data: String,
}

/// Parses a byte stream into server-sent events.
///
/// Bytes are buffered until a full line is available so multi-byte
/// characters split across chunks decode intact.
pub struct SseStream<S> {
    inner: S,
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    finished: bool,
}

impl<S> SseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            event: None,
            data: Vec::new(),
            finished: false,
        }
    }

    /// Consume buffered lines until one completes an event.
    fn try_parse_event(&mut self) -> Option<SseEvent> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.take_event() {
                    return Some(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue; // comment / keep-alive
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }
        None
    }

    fn take_event(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}

impl<S> Stream for SseStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    type Item = Result<SseEvent, McpError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(event) = this.try_parse_event() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e.into()))),
                Poll::Ready(None) => {
                    // Terminate a trailing partial line, then flush what is pending
                    this.finished = true;
                    if !this.buffer.is_empty() {
                        this.buffer.push(b'\n');
                    }
                    if let Some(event) = this.try_parse_event() {
                        return Poll::Ready(Some(Ok(event)));
                    }
                    return Poll::Ready(this.take_event().map(Ok));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Client side of the SSE transport.
pub struct SseClientTransport {
    http: reqwest::Client,
    endpoint: Url,
    events: SseStream<BoxStream<'static, Result<Bytes, reqwest::Error>>>,
}

impl SseClientTransport {
    /// Open the event stream at `{base_url}/sse` and wait for the `endpoint` event.
    pub async fn connect(base_url: &str) -> Result<Self, McpError> {
        let sse_url = Url::parse(&format!("{}/sse", base_url.trim_end_matches('/')))
            .map_err(|e| McpError::InvalidEndpoint(format!("{base_url}: {e}")))?;
        tracing::info!(url = %sse_url, "Opening SSE stream");

        let http = reqwest::Client::new();
        let response = http
            .get(sse_url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;
        let mut events = SseStream::new(response.bytes_stream().boxed());

        let endpoint = loop {
            match events.next().await {
                Some(Ok(event)) if event.event == "endpoint" => {
                    break sse_url
                        .join(event.data.trim())
                        .map_err(|e| McpError::InvalidEndpoint(format!("{}: {e}", event.data)))?;
                }
                Some(Ok(event)) => {
                    tracing::debug!(event = %event.event, "Ignoring event before endpoint");
                }
                Some(Err(e)) => return Err(e),
                None => {
                    return Err(McpError::ServerUnavailable(
                        "event stream closed before endpoint event".to_string(),
                    ))
                }
            }
        };
        tracing::debug!(endpoint = %endpoint, "SSE session established");

        Ok(Self {
            http,
            endpoint,
            events,
        })
    }

    /// URL this session POSTs frames to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl McpTransport for SseClientTransport {
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        while let Some(event) = self.events.next().await {
            let event = event?;
            if event.event == "message" {
                return Ok(Some(event.data));
            }
            tracing::debug!(event = %event.event, "Ignoring SSE event");
        }
        Ok(None)
    }

    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        self.http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(message.to_string())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&[u8]]) -> SseStream<impl Stream<Item = Result<Bytes, reqwest::Error>> + Unpin> {
        let items: Vec<Result<Bytes, reqwest::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p)))
            .collect();
        SseStream::new(futures::stream::iter(items))
    }

    async fn collect(stream: SseStream<impl Stream<Item = Result<Bytes, reqwest::Error>> + Unpin>) -> Vec<SseEvent> {
        stream.map(|e| e.unwrap()).collect().await
    }

    #[tokio::test]
    async fn test_endpoint_then_messages() {
        let events = collect(chunks(&[
            b"event: endpoint\ndata: /messages?session_id=abc\n\n",
            b"event: message\ndata: {\"id\":1}\n\n",
        ]))
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "endpoint");
        assert_eq!(events[0].data, "/messages?session_id=abc");
        assert_eq!(events[1].data, "{\"id\":1}");
    }

    #[tokio::test]
    async fn test_event_split_across_chunks() {
        let text = "event: message\ndata: 30°C\n\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC2).unwrap() + 1;
        let events = collect(chunks(&[&text[..split], &text[split..]])).await;
        assert_eq!(events[0].data, "30°C");
    }

    #[tokio::test]
    async fn test_defaults_comments_and_crlf() {
        let events = collect(chunks(&[
            b": keep-alive\r\n\r\ndata: first\r\ndata: second\r\n\r\n",
        ]))
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[tokio::test]
    async fn test_trailing_event_without_blank_line() {
        let events = collect(chunks(&[b"data: tail"])).await;
        assert_eq!(events, vec![SseEvent { event: "message".into(), data: "tail".into() }]);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let err = SseClientTransport::connect("http://127.0.0.1:1").await.err().unwrap();
        assert!(matches!(err, McpError::Http(_)));
    }

    #[tokio::test]
    async fn test_bad_base_url() {
        let err = SseClientTransport::connect("not a url").await.err().unwrap();
        assert!(matches!(err, McpError::InvalidEndpoint(_)));
    }
}
