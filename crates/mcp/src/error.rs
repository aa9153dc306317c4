//! Error types for the MCP crate.

use parley_runtime::DispatchError;

use crate::types::{error_codes, JsonRpcError};

/// Errors that can occur during MCP operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Failed to parse JSON.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Transport I/O error.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// HTTP failure on the SSE transport.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The SSE endpoint event carried an unusable address.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The requested method is not supported.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters for a method.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// No tool, resource or prompt under the requested name.
    #[error("{0}")]
    CapabilityNotFound(String),

    /// No resource template matches the requested URI.
    #[error("Unknown resource: {0}")]
    ResourceNotFound(String),

    /// Server/client not initialized.
    #[error("Not initialized: call initialize first")]
    NotInitialized,

    /// The peer closed the connection or is unavailable.
    #[error("Server unavailable: {0}")]
    ServerUnavailable(String),

    /// Error object returned by the remote peer.
    #[error("Remote error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl McpError {
    /// Convert to a JSON-RPC error object.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let code = match self {
            McpError::JsonParse(_) => error_codes::PARSE_ERROR,
            McpError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpError::InvalidParams(_) | McpError::CapabilityNotFound(_) => {
                error_codes::INVALID_PARAMS
            }
            McpError::ResourceNotFound(_) => error_codes::RESOURCE_NOT_FOUND,
            McpError::NotInitialized => error_codes::INVALID_REQUEST,
            McpError::Rpc { code, .. } => *code,
            _ => error_codes::INTERNAL_ERROR,
        };
        JsonRpcError {
            code,
            message: self.to_string(),
            data: None,
        }
    }
}

impl From<DispatchError> for McpError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotFound(e) => McpError::CapabilityNotFound(e.to_string()),
            DispatchError::UnknownUri(uri) => McpError::ResourceNotFound(uri),
            e @ DispatchError::SchemaMismatch { .. } => McpError::InvalidParams(e.to_string()),
        }
    }
}

impl From<JsonRpcError> for McpError {
    fn from(err: JsonRpcError) -> Self {
        McpError::Rpc {
            code: err.code,
            message: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_runtime::{Category, RegistryError};

    #[test]
    fn test_dispatch_errors_map_to_rpc_codes() {
        let not_found: McpError = DispatchError::NotFound(RegistryError::NotFound {
            category: Category::Tool,
            name: "nope".into(),
        })
        .into();
        assert_eq!(not_found.to_rpc_error().code, error_codes::INVALID_PARAMS);
        assert!(not_found.to_string().contains("nope"));

        let uri: McpError = DispatchError::UnknownUri("weird://x".into()).into();
        assert_eq!(uri.to_rpc_error().code, error_codes::RESOURCE_NOT_FOUND);
    }

    #[test]
    fn test_remote_error_keeps_code() {
        let err = McpError::from(JsonRpcError {
            code: error_codes::METHOD_NOT_FOUND,
            message: "Method not found: foo".into(),
            data: None,
        });
        assert_eq!(err.to_rpc_error().code, error_codes::METHOD_NOT_FOUND);
    }
}
