//! The scripted session: one listing per category, one call per capability.

use std::collections::HashMap;
use std::io::Write;

use serde_json::json;
use tracing::info;

use parley_mcp::{McpClient, McpError, McpTransport};

pub const WEATHER_CITY: &str = "Ahmedabad";
pub const QUOTE_URI: &str = "quote://1";
pub const LLM_QUERY: &str = "What are quantum computers?";

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Mcp(#[from] McpError),
    #[error("output: {0}")]
    Output(#[from] std::io::Error),
}

/// Run the fixed sequence against a connected client, writing one line per step.
///
/// Handler faults arrive as ordinary results and are printed like any other
/// payload. Only protocol or transport failures abort the run.
pub async fn run_scenario<T, W>(client: &mut McpClient<T>, out: &mut W) -> Result<(), ScenarioError>
where
    T: McpTransport,
    W: Write,
{
    let tools = client.list_tools().await?;
    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    writeln!(out, "tools: [{}]", names.join(", "))?;

    let sum = client.call_tool("add", json!({"a": 4, "b": 5})).await?;
    writeln!(out, "Addition: {}", sum.text())?;

    let joke = client.call_tool("random_joke", json!({})).await?;
    writeln!(out, "{}", joke.text())?;

    let weather = client
        .call_tool("get_weather", json!({"city": WEATHER_CITY}))
        .await?;
    writeln!(out, "Weather: {}", weather.text())?;

    let resources = client.list_resources().await?;
    let uris: Vec<_> = resources.iter().map(|r| r.uri.as_str()).collect();
    writeln!(out, "resources: [{}]", uris.join(", "))?;

    let templates = client.list_resource_templates().await?;
    let patterns: Vec<_> = templates.iter().map(|t| t.uri_template.as_str()).collect();
    writeln!(out, "resource templates: [{}]", patterns.join(", "))?;

    let quote = client.read_resource(QUOTE_URI).await?;
    let text = quote.contents.first().map(|c| c.text.as_str()).unwrap_or_default();
    writeln!(out, "Quote: {text}")?;

    let prompts = client.list_prompts().await?;
    let names: Vec<_> = prompts.iter().map(|p| p.name.as_str()).collect();
    writeln!(out, "prompts: [{}]", names.join(", "))?;

    let args = HashMap::from([("query".to_string(), LLM_QUERY.to_string())]);
    let answer = client.get_prompt("ask_llm", args).await?;
    let text = answer
        .messages
        .first()
        .map(|m| m.content.as_text())
        .unwrap_or_default();
    writeln!(out, "LLM Response: {text}")?;

    info!("Scenario complete");
    Ok(())
}
