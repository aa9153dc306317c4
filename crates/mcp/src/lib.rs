//! MCP (Model Context Protocol) implementation for parley.
//!
//! This crate implements the MCP protocol over JSON-RPC 2.0, exposing the
//! capabilities of a `parley_runtime::Dispatcher` to remote clients.
//!
//! # Architecture
//!
//! - **types**: JSON-RPC 2.0 and MCP-specific protocol types
//! - **transport**: Pluggable transport layer (stdio, channels)
//! - **sse**: SSE client transport and event-stream parser
//! - **server**: MCP server wrapping a `Dispatcher`
//! - **client**: MCP client generic over its transport
//! - **error**: Unified error types
//!
//! # Usage
//!
//! ## Server
//! ```no_run
//! use parley_mcp::server::McpServer;
//! use parley_mcp::transport::StdioTransport;
//! use parley_runtime::{CapabilityRegistry, Dispatcher};
//!
//! # async fn example() {
//! let dispatcher = Dispatcher::new(CapabilityRegistry::new());
//! let mut server = McpServer::new(dispatcher);
//! let mut transport = StdioTransport::new();
//! server.run(&mut transport).await.unwrap();
//! # }
//! ```
//!
//! ## Client
//! ```no_run
//! use parley_mcp::{McpClient, SseClientTransport};
//!
//! # async fn example() {
//! let transport = SseClientTransport::connect("http://localhost:8000").await.unwrap();
//! let mut client = McpClient::connect(transport).await.unwrap();
//! let tools = client.list_tools().await.unwrap();
//! # }
//! ```

pub mod types;
pub mod transport;
pub mod sse;
pub mod server;
pub mod client;
pub mod error;

pub use types::*;
pub use transport::{McpTransport, StdioTransport, ChannelTransport};
pub use sse::{SseClientTransport, SseEvent, SseStream};
pub use server::McpServer;
pub use client::McpClient;
pub use error::McpError;
