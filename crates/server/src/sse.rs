//! MCP over HTTP + server-sent events.
//!
//! - `GET /sse` opens a session. The first event (`endpoint`) names the URL
//!   the client POSTs frames to; each response frame follows as a `message` event.
//! - `POST /messages?session_id=<id>` feeds one JSON-RPC frame into that session.
//! - `GET /health` reports liveness.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use parley_mcp::{ChannelTransport, McpServer};

use crate::state::AppState;

const SESSION_BUFFER: usize = 32;

/// Build the HTTP router for the SSE transport.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sse", get(sse_connect))
        .route("/messages", post(post_message))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("MCP SSE server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub sessions: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.session_count().await,
    })
}

/// Open a session: spawn an `McpServer` fed by this session's POSTed frames.
pub async fn sse_connect(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().simple().to_string();
    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(SESSION_BUFFER);
    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(SESSION_BUFFER);

    state
        .sessions
        .write()
        .await
        .insert(session_id.clone(), inbound_tx);
    info!(session = %session_id, "SSE session opened");

    let mut server = McpServer::new(state.dispatcher.clone()).with_name(state.server_name.clone());
    let sessions = state.sessions.clone();
    let id = session_id.clone();
    let disconnected = outbound_tx.clone();
    tokio::spawn(async move {
        let mut transport = ChannelTransport::new(inbound_rx, outbound_tx);
        // The event stream dropping its receiver means the client went away
        tokio::select! {
            result = server.run(&mut transport) => {
                if let Err(e) = result {
                    warn!(session = %id, error = %e, "MCP session ended with error");
                }
            }
            _ = disconnected.closed() => {
                debug!(session = %id, "SSE client disconnected");
            }
        }
        sessions.write().await.remove(&id);
        info!(session = %id, "SSE session closed");
    });

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session_id={session_id}"));
    let messages =
        ReceiverStream::new(outbound_rx).map(|frame| Event::default().event("message").data(frame));
    let events = stream::once(async move { endpoint })
        .chain(messages)
        .map(Ok::<_, Infallible>);

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub session_id: String,
}

/// Accept one frame for an open session. Responses travel back over the event stream.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> (StatusCode, &'static str) {
    let sender = state.sessions.read().await.get(&query.session_id).cloned();
    let Some(sender) = sender else {
        warn!(session = %query.session_id, "Frame for unknown session");
        return (StatusCode::NOT_FOUND, "Could not find session");
    };

    if sender.send(body).await.is_err() {
        warn!(session = %query.session_id, "Frame for closed session");
        state.sessions.write().await.remove(&query.session_id);
        return (StatusCode::NOT_FOUND, "Could not find session");
    }
    (StatusCode::ACCEPTED, "Accepted")
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_mcp::{McpClient, SseClientTransport};
    use parley_runtime::testing::{EchoCapability, FailingCapability, StaticCapability};
    use parley_runtime::{
        CapabilityDescriptor, CapabilityError, CapabilityRegistry, Dispatcher, ParamSpec,
        ParamType,
    };
    use serde_json::json;
    use std::collections::HashMap;

    fn test_state() -> Arc<AppState> {
        let mut reg = CapabilityRegistry::new();
        reg.register(EchoCapability::tool("echo")).unwrap();
        reg.register(FailingCapability::new(
            "random_joke",
            CapabilityError::connectivity("Error fetching joke", "connection refused"),
        ))
        .unwrap();
        reg.register(StaticCapability::new(
            CapabilityDescriptor::resource("get_quote", "quote://{quote_id}", "Quote by id")
                .param(ParamSpec::required("quote_id", ParamType::Integer)),
            "Stay hungry, stay foolish.",
        ))
        .unwrap();
        reg.register(EchoCapability::prompt("ask")).unwrap();
        Arc::new(AppState::new(Dispatcher::new(reg)))
    }

    async fn spawn_app(state: Arc<AppState>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_app(test_state()).await;
        let body: serde_json::Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let base = spawn_app(test_state()).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/messages?session_id=missing"))
            .body(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_over_sse() {
        let state = test_state();
        let base = spawn_app(state.clone()).await;

        let transport = SseClientTransport::connect(&base).await.unwrap();
        assert!(transport.endpoint().as_str().contains("/messages?session_id="));
        let mut client = McpClient::connect(transport).await.unwrap();
        assert_eq!(state.session_count().await, 1);

        let tools = client.list_tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "random_joke"]);

        let echoed = client.call_tool("echo", json!({"message": "9"})).await.unwrap();
        assert_eq!(echoed.text(), "9");

        let joke = client.call_tool("random_joke", json!({})).await.unwrap();
        assert!(!joke.is_error);
        assert_eq!(joke.text(), "Error fetching joke: connection refused");

        let quote = client.read_resource("quote://1").await.unwrap();
        assert_eq!(quote.contents[0].text, "Stay hungry, stay foolish.");

        let args = HashMap::from([("message".to_string(), "What are quantum computers?".to_string())]);
        let prompt = client.get_prompt("ask", args).await.unwrap();
        assert_eq!(prompt.messages[0].content.as_text(), "What are quantum computers?");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let state = test_state();
        let base = spawn_app(state.clone()).await;

        let mut first = McpClient::connect(SseClientTransport::connect(&base).await.unwrap())
            .await
            .unwrap();
        let mut second = McpClient::connect(SseClientTransport::connect(&base).await.unwrap())
            .await
            .unwrap();
        assert_eq!(state.session_count().await, 2);

        let a = first.call_tool("echo", json!({"message": "first"})).await.unwrap();
        let b = second.call_tool("echo", json!({"message": "second"})).await.unwrap();
        assert_eq!(a.text(), "first");
        assert_eq!(b.text(), "second");
    }
}
