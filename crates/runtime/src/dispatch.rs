//! Invocation dispatch: lookup, schema check, execute, normalize.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capability::{Arguments, CapabilityDescriptor, Category, ErrorKind};
use crate::registry::{CapabilityEntry, CapabilityRegistry, RegistryError};

/// One call to route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub target: String,
    pub category: Category,
    #[serde(default)]
    pub arguments: Arguments,
}

/// Outcome of exactly one handler execution.
///
/// `payload` always holds displayable text, whether the handler succeeded or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub success: bool,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl InvocationResult {
    pub fn ok(payload: impl Into<String>) -> Self {
        Self {
            success: true,
            payload: payload.into(),
            error: None,
        }
    }

    pub fn failed(kind: ErrorKind, payload: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: payload.into(),
            error: Some(kind),
        }
    }
}

/// Failures that happen before a handler runs.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    NotFound(#[from] RegistryError),
    #[error("{category} '{name}': {reason}")]
    SchemaMismatch {
        category: Category,
        name: String,
        reason: String,
    },
    #[error("no resource matches URI '{0}'")]
    UnknownUri(String),
}

/// Routes invocations to registry entries.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CapabilityRegistry>,
}

impl Dispatcher {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, request: InvocationRequest) -> Result<InvocationResult, DispatchError> {
        self.invoke(request.category, &request.target, request.arguments).await
    }

    /// Look up `name`, validate `arguments`, run the handler.
    ///
    /// Handler faults (including panics) come back as a failed `InvocationResult`,
    /// never as `Err`.
    pub async fn invoke(
        &self,
        category: Category,
        name: &str,
        arguments: Arguments,
    ) -> Result<InvocationResult, DispatchError> {
        let entry = self.registry.lookup(category, name)?;
        validate(entry.descriptor(), &arguments)?;
        Ok(execute(entry, &arguments).await)
    }

    /// Resolve a concrete resource URI against registered templates and read it.
    ///
    /// Template segments are converted to the declared parameter types.
    pub async fn read_resource(&self, uri: &str) -> Result<InvocationResult, DispatchError> {
        let (entry, captured) = self
            .registry
            .resources()
            .find_map(|entry| {
                let captured = entry.template()?.match_uri(uri)?;
                Some((entry, captured))
            })
            .ok_or_else(|| DispatchError::UnknownUri(uri.to_string()))?;

        let descriptor = entry.descriptor();
        let mut arguments = Arguments::new();
        for (var, raw) in captured {
            let spec = descriptor.params.iter().find(|p| p.name == var);
            let value = spec
                .and_then(|p| p.ty.coerce(&raw))
                .ok_or_else(|| DispatchError::SchemaMismatch {
                    category: Category::Resource,
                    name: descriptor.name.clone(),
                    reason: format!(
                        "'{var}' value '{raw}' is not a valid {}",
                        spec.map(|p| p.ty.as_str()).unwrap_or("parameter")
                    ),
                })?;
            arguments.insert(var, value);
        }

        validate(descriptor, &arguments)?;
        Ok(execute(entry, &arguments).await)
    }
}

/// Presence and JSON-type check for every declared parameter. Extra arguments are ignored.
fn validate(descriptor: &CapabilityDescriptor, arguments: &Arguments) -> Result<(), DispatchError> {
    for spec in &descriptor.params {
        let reason = match arguments.get(&spec.name) {
            None | Some(serde_json::Value::Null) if spec.required => {
                format!("missing required parameter '{}'", spec.name)
            }
            Some(value) if !value.is_null() && !spec.ty.accepts(value) => {
                format!("parameter '{}' must be {}", spec.name, spec.ty.as_str())
            }
            _ => continue,
        };
        return Err(DispatchError::SchemaMismatch {
            category: descriptor.category,
            name: descriptor.name.clone(),
            reason,
        });
    }
    Ok(())
}

async fn execute(entry: &CapabilityEntry, arguments: &Arguments) -> InvocationResult {
    let name = entry.name();
    let category = entry.category();
    debug!(%category, name = %name, "Invoking capability");

    let outcome = AssertUnwindSafe(entry.handler().invoke(arguments))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(payload)) => InvocationResult::ok(payload),
        Ok(Err(err)) => {
            debug!(%category, name = %name, error = %err, "Capability returned an error");
            InvocationResult::failed(err.kind(), err.to_string())
        }
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(%category, name = %name, panic = %detail, "Capability panicked");
            InvocationResult::failed(ErrorKind::Panicked, format!("Internal error in {name}: {detail}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityError, ParamSpec, ParamType};
    use crate::testing::{EchoCapability, FailingCapability, PanickingCapability, StaticCapability};
    use serde_json::json;

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap_or_default()
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = CapabilityRegistry::new();
        registry.register(EchoCapability::tool("echo")).unwrap();
        registry
            .register(FailingCapability::new(
                "offline",
                CapabilityError::connectivity("Error fetching joke", "connection refused"),
            ))
            .unwrap();
        registry.register(PanickingCapability).unwrap();
        registry
            .register(StaticCapability::new(
                CapabilityDescriptor::resource("get_item", "item://{id}", "Item by id")
                    .param(ParamSpec::required("id", ParamType::Integer)),
                "item body",
            ))
            .unwrap();
        Dispatcher::new(registry)
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let result = dispatcher()
            .invoke(Category::Tool, "echo", args(json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(result, InvocationResult::ok("hi"));
    }

    #[tokio::test]
    async fn test_invoke_unknown_name() {
        let err = dispatcher()
            .invoke(Category::Tool, "missing", Arguments::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(RegistryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_schema_mismatch() {
        let d = dispatcher();
        let err = d.invoke(Category::Tool, "echo", Arguments::new()).await.unwrap_err();
        assert!(err.to_string().contains("missing required parameter 'message'"));

        let err = d
            .invoke(Category::Tool, "echo", args(json!({"message": 5})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must be string"));
    }

    #[tokio::test]
    async fn test_handler_fault_becomes_result() {
        let result = dispatcher()
            .invoke(Category::Tool, "offline", Arguments::new())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorKind::Connectivity));
        assert_eq!(result.payload, "Error fetching joke: connection refused");
    }

    #[tokio::test]
    async fn test_panic_becomes_result() {
        let result = dispatcher()
            .invoke(Category::Tool, "panic", Arguments::new())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error, Some(ErrorKind::Panicked));
        assert!(result.payload.contains("handler blew up"));
    }

    #[tokio::test]
    async fn test_read_resource_by_uri() {
        let d = dispatcher();
        let result = d.read_resource("item://7").await.unwrap();
        assert_eq!(result.payload, "item body");

        assert!(matches!(
            d.read_resource("item://seven").await,
            Err(DispatchError::SchemaMismatch { .. })
        ));
        assert!(matches!(
            d.read_resource("other://7").await,
            Err(DispatchError::UnknownUri(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_request() {
        let request: InvocationRequest = serde_json::from_value(json!({
            "target": "echo",
            "category": "tool",
            "arguments": {"message": "routed"}
        }))
        .unwrap();
        let result = dispatcher().dispatch(request).await.unwrap();
        assert_eq!(result.payload, "routed");
    }

    #[tokio::test]
    async fn test_listing_unchanged_by_invocation() {
        let d = dispatcher();
        let before: Vec<_> = d.registry().list(Category::Tool).cloned().collect();
        d.invoke(Category::Tool, "echo", args(json!({"message": "x"})))
            .await
            .unwrap();
        let after: Vec<_> = d.registry().list(Category::Tool).cloned().collect();
        assert_eq!(before, after);
    }
}
