//! Capability registry and invocation dispatch.
//!
//! - **capability**: descriptors, parameter schemas, the `Capability` trait
//! - **registry**: the immutable name → entry mapping, one namespace per category
//! - **dispatch**: argument validation and catch-and-stringify execution
//! - **handlers**: the built-in tools, resource and prompt
//! - **adapters**: the external systems those handlers call

pub mod adapters;
pub mod capability;
pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod template;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use capability::{
    Arguments, Capability, CapabilityDescriptor, CapabilityError, Category, ErrorKind, ParamSpec,
    ParamType,
};
pub use dispatch::{DispatchError, Dispatcher, InvocationRequest, InvocationResult};
pub use handlers::{register_builtin, Adapters};
pub use registry::{CapabilityEntry, CapabilityRegistry, RegistryError};
pub use template::{TemplateError, UriTemplate};
