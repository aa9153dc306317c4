//! Parley MCP server: serves the built-in capabilities over SSE or stdio.

pub mod sse;
pub mod state;

pub use sse::{build_router, serve};
pub use state::AppState;
