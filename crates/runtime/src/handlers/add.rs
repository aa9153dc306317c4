use async_trait::async_trait;

use crate::capability::{
    arg_i64, Arguments, Capability, CapabilityDescriptor, CapabilityError, ParamSpec, ParamType,
};

/// `add(a, b)`: integer sum.
pub struct AddTool;

#[async_trait]
impl Capability for AddTool {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::tool("add", "Add two integers and return the sum.")
            .param(ParamSpec::required("a", ParamType::Integer))
            .param(ParamSpec::required("b", ParamType::Integer))
    }

    async fn invoke(&self, args: &Arguments) -> Result<String, CapabilityError> {
        let a = arg_i64(args, "a")?;
        let b = arg_i64(args, "b")?;
        let sum = a
            .checked_add(b)
            .ok_or_else(|| CapabilityError::InvalidArgument(format!("{a} + {b} overflows")))?;
        Ok(sum.to_string())
    }
}
