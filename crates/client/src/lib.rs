//! Parley MCP client: the scripted session run against a server.

pub mod scenario;

pub use scenario::{run_scenario, ScenarioError};
