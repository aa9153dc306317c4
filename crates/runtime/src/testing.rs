//! Stub capabilities for tests.

use async_trait::async_trait;

use crate::capability::{
    arg_str, Arguments, Capability, CapabilityDescriptor, CapabilityError, Category, ParamSpec,
    ParamType,
};

/// Echoes back its `message` argument.
pub struct EchoCapability {
    descriptor: CapabilityDescriptor,
}

impl EchoCapability {
    fn with(descriptor: CapabilityDescriptor) -> Self {
        Self {
            descriptor: descriptor.param(ParamSpec::required("message", ParamType::String)),
        }
    }

    pub fn tool(name: &str) -> Self {
        Self::with(CapabilityDescriptor::tool(name, "Echoes back the input message. For testing."))
    }

    pub fn prompt(name: &str) -> Self {
        Self::with(CapabilityDescriptor::prompt(name, "Echoes back the input message. For testing."))
    }
}

#[async_trait]
impl Capability for EchoCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        self.descriptor.clone()
    }

    async fn invoke(&self, args: &Arguments) -> Result<String, CapabilityError> {
        Ok(arg_str(args, "message")?.to_string())
    }
}

/// Returns a fixed payload regardless of arguments.
pub struct StaticCapability {
    descriptor: CapabilityDescriptor,
    payload: String,
}

impl StaticCapability {
    pub fn new(descriptor: CapabilityDescriptor, payload: &str) -> Self {
        Self {
            descriptor,
            payload: payload.to_string(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.descriptor.category = category;
        self
    }
}

#[async_trait]
impl Capability for StaticCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        self.descriptor.clone()
    }

    async fn invoke(&self, _args: &Arguments) -> Result<String, CapabilityError> {
        Ok(self.payload.clone())
    }
}

/// Always fails with the given error.
pub struct FailingCapability {
    name: String,
    error: CapabilityError,
}

impl FailingCapability {
    pub fn new(name: &str, error: CapabilityError) -> Self {
        Self {
            name: name.to_string(),
            error,
        }
    }
}

#[async_trait]
impl Capability for FailingCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::tool(&self.name, "Always fails. For testing.")
    }

    async fn invoke(&self, _args: &Arguments) -> Result<String, CapabilityError> {
        Err(self.error.clone())
    }
}

/// Panics when invoked.
pub struct PanickingCapability;

#[async_trait]
impl Capability for PanickingCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::tool("panic", "Panics. For testing.")
    }

    async fn invoke(&self, _args: &Arguments) -> Result<String, CapabilityError> {
        panic!("handler blew up")
    }
}
