//! MCP server implementation.
//!
//! Wraps a `Dispatcher` and exposes its tools, resources and prompts over the
//! MCP protocol. Handles JSON-RPC requests and dispatches them to the
//! appropriate handlers.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use parley_runtime::{Arguments, Category, Dispatcher};

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

const TEXT_MIME: &str = "text/plain";

/// MCP server that bridges a `Dispatcher` to MCP clients.
///
/// One instance serves one session; clone the dispatcher to serve more.
pub struct McpServer {
    dispatcher: Dispatcher,
    server_name: String,
    server_version: String,
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server over the given dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            server_name: "parley".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            initialized: false,
        }
    }

    /// Set the server name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Run the server loop, reading from and writing to the transport.
    ///
    /// Processes JSON-RPC requests until the transport is closed.
    pub async fn run<T: McpTransport>(&mut self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(server = %self.server_name, "MCP server starting");

        while let Some(line) = transport.receive().await? {
            tracing::debug!(message = %line, "Received message");

            if let Some(response) = self.handle_message(&line).await {
                let json = serde_json::to_string(&response)?;
                tracing::debug!(response = %json, "Sending response");
                transport.send(&json).await?;
            }
        }

        tracing::info!("Transport closed, shutting down");
        Ok(())
    }

    /// Handle one raw frame. Notifications produce no response.
    pub async fn handle_message(&mut self, line: &str) -> Option<JsonRpcResponse> {
        // Distinguish requests (have "id") from notifications (no "id")
        // by parsing as generic Value first.
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON");
                return Some(error_response(None, McpError::JsonParse(e)));
            }
        };

        if raw.get("id").is_none() {
            match serde_json::from_value::<JsonRpcNotification>(raw) {
                Ok(notif) => self.handle_notification(&notif),
                Err(e) => tracing::debug!(error = %e, "Dropping malformed notification"),
            }
            return None;
        }

        match serde_json::from_value::<JsonRpcRequest>(raw) {
            Ok(request) => Some(self.handle_request(&request).await),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON-RPC request");
                Some(error_response(None, McpError::JsonParse(e)))
            }
        }
    }

    /// Handle a single JSON-RPC request and produce a response.
    pub async fn handle_request(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let params = &request.params;

        let method = request.method.as_str();
        if !self.initialized && !matches!(method, "initialize" | "ping") {
            tracing::warn!(method = %method, "Request before initialize");
            return error_response(Some(id), McpError::NotInitialized);
        }

        match method {
            "initialize" => respond(id, self.handle_initialize(params)),
            "ping" => respond(id, Ok(serde_json::json!({}))),
            "tools/list" => respond(id, Ok(self.list_tools())),
            "tools/call" => respond(id, self.call_tool(params).await),
            "resources/list" => respond(id, Ok(self.list_resources())),
            "resources/templates/list" => respond(id, Ok(self.list_resource_templates())),
            "resources/read" => respond(id, self.read_resource(params).await),
            "prompts/list" => respond(id, Ok(self.list_prompts())),
            "prompts/get" => respond(id, self.get_prompt(params).await),
            method => {
                tracing::warn!(method = %method, "Unknown method");
                error_response(Some(id), McpError::MethodNotFound(method.to_string()))
            }
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => {
                tracing::info!("Client confirmed initialization");
            }
            "notifications/cancelled" => {
                tracing::debug!("Client cancelled a request");
            }
            method => {
                tracing::debug!(method = %method, "Unknown notification, ignoring");
            }
        }
    }

    fn handle_initialize(&mut self, params: &Option<Value>) -> Result<InitializeResult, McpError> {
        let params: InitializeParams = parse_params(params)?;
        tracing::info!(
            client = %params.client_info.name,
            protocol = %params.protocol_version,
            "Handling initialize"
        );
        if params.protocol_version != PROTOCOL_VERSION {
            tracing::warn!(
                requested = %params.protocol_version,
                supported = PROTOCOL_VERSION,
                "Protocol version mismatch, answering with ours"
            );
        }
        self.initialized = true;

        Ok(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ListChanged::default()),
                resources: Some(ResourcesCapability::default()),
                prompts: Some(ListChanged::default()),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        })
    }

    fn list_tools(&self) -> ListToolsResult {
        tracing::debug!("Handling tools/list");
        let tools = self
            .dispatcher
            .registry()
            .list(Category::Tool)
            .map(ToolInfo::from)
            .collect();
        ListToolsResult { tools }
    }

    async fn call_tool(&self, params: &Option<Value>) -> Result<CallToolResult, McpError> {
        let call: CallToolParams = parse_params(params)?;
        tracing::debug!(tool = %call.name, "Handling tools/call");

        let arguments = match call.arguments {
            Value::Null => Arguments::new(),
            Value::Object(map) => map,
            other => {
                return Err(McpError::InvalidParams(format!(
                    "arguments must be an object, got {other}"
                )))
            }
        };

        let result = self
            .dispatcher
            .invoke(Category::Tool, &call.name, arguments)
            .await?;

        // Failure text is a normal result on the wire, like any other payload
        Ok(CallToolResult {
            content: vec![Content::text(result.payload)],
            is_error: false,
        })
    }

    /// Resources without template variables are directly listable.
    fn list_resources(&self) -> ListResourcesResult {
        tracing::debug!("Handling resources/list");
        let resources = self
            .dispatcher
            .registry()
            .resources()
            .filter_map(|entry| {
                let template = entry.template()?;
                template.is_static().then(|| ResourceInfo {
                    uri: template.as_str().to_string(),
                    name: entry.name().to_string(),
                    description: Some(entry.descriptor().description.clone()),
                    mime_type: Some(TEXT_MIME.to_string()),
                })
            })
            .collect();
        ListResourcesResult { resources }
    }

    fn list_resource_templates(&self) -> ListResourceTemplatesResult {
        tracing::debug!("Handling resources/templates/list");
        let resource_templates = self
            .dispatcher
            .registry()
            .resources()
            .filter_map(|entry| {
                let template = entry.template()?;
                (!template.is_static()).then(|| ResourceTemplateInfo {
                    uri_template: template.as_str().to_string(),
                    name: entry.name().to_string(),
                    description: Some(entry.descriptor().description.clone()),
                    mime_type: Some(TEXT_MIME.to_string()),
                })
            })
            .collect();
        ListResourceTemplatesResult { resource_templates }
    }

    async fn read_resource(&self, params: &Option<Value>) -> Result<ReadResourceResult, McpError> {
        let read: ReadResourceParams = parse_params(params)?;
        tracing::debug!(uri = %read.uri, "Handling resources/read");

        let result = self.dispatcher.read_resource(&read.uri).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: read.uri,
                mime_type: Some(TEXT_MIME.to_string()),
                text: result.payload,
            }],
        })
    }

    fn list_prompts(&self) -> ListPromptsResult {
        tracing::debug!("Handling prompts/list");
        let prompts = self
            .dispatcher
            .registry()
            .list(Category::Prompt)
            .map(PromptInfo::from)
            .collect();
        ListPromptsResult { prompts }
    }

    /// Prompt arguments arrive as strings and are converted to the declared types.
    async fn get_prompt(&self, params: &Option<Value>) -> Result<GetPromptResult, McpError> {
        let get: GetPromptParams = parse_params(params)?;
        tracing::debug!(prompt = %get.name, "Handling prompts/get");

        let entry = self
            .dispatcher
            .registry()
            .lookup(Category::Prompt, &get.name)
            .map_err(|e| McpError::CapabilityNotFound(e.to_string()))?;
        let descriptor = entry.descriptor().clone();

        let mut arguments = Arguments::new();
        for (name, raw) in get.arguments {
            let value = match descriptor.params.iter().find(|p| p.name == name) {
                Some(spec) => spec.ty.coerce(&raw).ok_or_else(|| {
                    McpError::InvalidParams(format!(
                        "argument '{name}' must be {}",
                        spec.ty.as_str()
                    ))
                })?,
                None => Value::String(raw),
            };
            arguments.insert(name, value);
        }

        let result = self
            .dispatcher
            .invoke(Category::Prompt, &get.name, arguments)
            .await?;

        Ok(GetPromptResult {
            description: Some(descriptor.description),
            messages: vec![PromptMessage {
                role: PromptRole::User,
                content: Content::text(result.payload),
            }],
        })
    }
}

fn parse_params<P: DeserializeOwned>(params: &Option<Value>) -> Result<P, McpError> {
    let params = params
        .clone()
        .ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
    serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn respond<R: Serialize>(id: RpcId, result: Result<R, McpError>) -> JsonRpcResponse {
    match result.and_then(|r| serde_json::to_value(r).map_err(McpError::from)) {
        Ok(val) => JsonRpcResponse::success(id, val),
        Err(err) => error_response(Some(id), err),
    }
}

fn error_response(id: Option<RpcId>, err: McpError) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(err.to_rpc_error()),
    }
}
