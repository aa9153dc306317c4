//! MCP client implementation.
//!
//! Drives one session over any `McpTransport`: performs the initialize
//! handshake, then lists and invokes tools, resources and prompts.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

/// An MCP client bound to a single transport.
///
/// Requests are strictly sequential: each call sends one request and waits
/// for the response carrying the same id.
pub struct McpClient<T: McpTransport> {
    transport: T,
    next_id: i64,
    server_info: Option<ServerInfo>,
    capabilities: ServerCapabilities,
}

impl<T: McpTransport> McpClient<T> {
    /// Connect over `transport` and perform the initialize handshake.
    pub async fn connect(transport: T) -> Result<Self, McpError> {
        let mut client = Self {
            transport,
            next_id: 1,
            server_info: None,
            capabilities: ServerCapabilities::default(),
        };
        client.initialize().await?;
        Ok(client)
    }

    /// Identity the server reported during initialization.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// Send a JSON-RPC request and wait for its response.
    ///
    /// Frames that are not the matching response (server notifications,
    /// stale responses) are logged and skipped.
    async fn request<R: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<R, McpError> {
        let id = RpcId::Number(self.next_id);
        self.next_id += 1;

        let request = JsonRpcRequest::new(id.clone(), method, params);
        let json = serde_json::to_string(&request)?;

        tracing::debug!(method = %method, id = ?id, "Sending request");
        self.transport.send(&json).await?;

        loop {
            let line = self.transport.receive().await?.ok_or_else(|| {
                McpError::ServerUnavailable(format!("connection closed awaiting '{method}'"))
            })?;

            let raw: Value = serde_json::from_str(&line)?;
            let is_response = raw.get("result").is_some() || raw.get("error").is_some();
            if !is_response {
                tracing::debug!(message = %line, "Skipping non-response frame");
                continue;
            }

            let response: JsonRpcResponse = serde_json::from_value(raw)?;
            if response.id.as_ref() != Some(&id) {
                tracing::debug!(expected = ?id, got = ?response.id, "Skipping unrelated response");
                continue;
            }

            if let Some(err) = response.error {
                return Err(err.into());
            }
            let result = response.result.unwrap_or(Value::Null);
            return Ok(serde_json::from_value(result)?);
        }
    }

    /// Send a JSON-RPC notification (no response expected).
    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let notif = JsonRpcNotification::new(method, params);
        let json = serde_json::to_string(&notif)?;
        self.transport.send(&json).await
    }

    /// Perform MCP initialization handshake.
    async fn initialize(&mut self) -> Result<(), McpError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: "parley-client".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
        };

        let result: InitializeResult = self
            .request("initialize", Some(serde_json::to_value(params)?))
            .await?;
        tracing::info!(
            server = %result.server_info.name,
            protocol = %result.protocol_version,
            "MCP client initialized"
        );
        self.server_info = Some(result.server_info);
        self.capabilities = result.capabilities;

        self.notify("notifications/initialized", None).await
    }

    pub async fn ping(&mut self) -> Result<(), McpError> {
        let _: Value = self.request("ping", None).await?;
        Ok(())
    }

    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, McpError> {
        let result: ListToolsResult = self.request("tools/list", None).await?;
        tracing::debug!(count = result.tools.len(), "Listed tools");
        Ok(result.tools)
    }

    /// Call a tool. Handler failures come back as ordinary text results.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        self.request("tools/call", Some(params)).await
    }

    pub async fn list_resources(&mut self) -> Result<Vec<ResourceInfo>, McpError> {
        let result: ListResourcesResult = self.request("resources/list", None).await?;
        Ok(result.resources)
    }

    pub async fn list_resource_templates(&mut self) -> Result<Vec<ResourceTemplateInfo>, McpError> {
        let result: ListResourceTemplatesResult =
            self.request("resources/templates/list", None).await?;
        Ok(result.resource_templates)
    }

    pub async fn read_resource(&mut self, uri: &str) -> Result<ReadResourceResult, McpError> {
        self.request("resources/read", Some(serde_json::json!({ "uri": uri })))
            .await
    }

    pub async fn list_prompts(&mut self) -> Result<Vec<PromptInfo>, McpError> {
        let result: ListPromptsResult = self.request("prompts/list", None).await?;
        Ok(result.prompts)
    }

    pub async fn get_prompt(
        &mut self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<GetPromptResult, McpError> {
        let params = GetPromptParams {
            name: name.to_string(),
            arguments,
        };
        self.request("prompts/get", Some(serde_json::to_value(params)?))
            .await
    }

    /// Hand back the transport, ending the session from this side.
    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::McpServer;
    use crate::transport::ChannelTransport;
    use parley_runtime::testing::{EchoCapability, StaticCapability};
    use parley_runtime::{CapabilityDescriptor, CapabilityRegistry, Dispatcher, ParamSpec, ParamType};
    use serde_json::json;

    fn spawn_server() -> ChannelTransport {
        let mut reg = CapabilityRegistry::new();
        reg.register(EchoCapability::tool("echo")).unwrap();
        reg.register(StaticCapability::new(
            CapabilityDescriptor::resource("get_quote", "quote://{quote_id}", "Quote by id")
                .param(ParamSpec::required("quote_id", ParamType::Integer)),
            "Hello",
        ))
        .unwrap();
        reg.register(EchoCapability::prompt("ask")).unwrap();

        let (client_side, mut server_side) = ChannelTransport::pair();
        let mut server = McpServer::new(Dispatcher::new(reg));
        tokio::spawn(async move { server.run(&mut server_side).await });
        client_side
    }

    #[tokio::test]
    async fn test_full_session() {
        let mut client = McpClient::connect(spawn_server()).await.unwrap();
        assert_eq!(client.server_info().unwrap().name, "parley");
        client.ping().await.unwrap();

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");

        let result = client
            .call_tool("echo", json!({"message": "round trip"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.text(), "round trip");

        assert!(client.list_resources().await.unwrap().is_empty());
        let templates = client.list_resource_templates().await.unwrap();
        assert_eq!(templates[0].uri_template, "quote://{quote_id}");

        let read = client.read_resource("quote://1").await.unwrap();
        assert_eq!(read.contents[0].text, "Hello");

        let prompts = client.list_prompts().await.unwrap();
        assert_eq!(prompts[0].name, "ask");

        let args = HashMap::from([("message".to_string(), "hi".to_string())]);
        let prompt = client.get_prompt("ask", args).await.unwrap();
        assert_eq!(prompt.messages[0].content.as_text(), "hi");
    }

    #[tokio::test]
    async fn test_remote_error_surfaces_with_code() {
        let mut client = McpClient::connect(spawn_server()).await.unwrap();
        let err = client.call_tool("missing", json!({})).await.unwrap_err();
        match err {
            McpError::Rpc { code, .. } => assert_eq!(code, error_codes::INVALID_PARAMS),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_skips_unrelated_frames() {
        let (client_side, mut server_side) = ChannelTransport::pair();

        let fake_server = tokio::spawn(async move {
            let init: JsonRpcRequest =
                serde_json::from_str(&server_side.receive().await.unwrap().unwrap()).unwrap();
            // A log notification and a stale response arrive before the real answer
            server_side
                .send(r#"{"jsonrpc":"2.0","method":"notifications/message","params":{}}"#)
                .await
                .unwrap();
            server_side
                .send(r#"{"jsonrpc":"2.0","id":999,"result":{}}"#)
                .await
                .unwrap();
            let reply = JsonRpcResponse::success(
                init.id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "serverInfo": {"name": "fake"}
                }),
            );
            server_side
                .send(&serde_json::to_string(&reply).unwrap())
                .await
                .unwrap();
            // Swallow the initialized notification
            server_side.receive().await.unwrap();
        });

        let client = McpClient::connect(client_side).await.unwrap();
        assert_eq!(client.server_info().unwrap().name, "fake");
        fake_server.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_transport_is_unavailable() {
        let (client_side, server_side) = ChannelTransport::pair();
        drop(server_side);
        let err = McpClient::connect(client_side).await.err().unwrap();
        assert!(matches!(err, McpError::Transport(_) | McpError::ServerUnavailable(_)));
    }
}
