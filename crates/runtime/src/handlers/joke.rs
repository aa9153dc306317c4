use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::JokeSource;
use crate::capability::{Arguments, Capability, CapabilityDescriptor, CapabilityError};

/// `random_joke()`: "setup - punchline".
pub struct JokeTool {
    source: Arc<dyn JokeSource>,
}

impl JokeTool {
    pub fn new(source: Arc<dyn JokeSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Capability for JokeTool {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::tool("random_joke", "Fetch a random joke.")
    }

    async fn invoke(&self, _args: &Arguments) -> Result<String, CapabilityError> {
        let joke = self
            .source
            .random()
            .await
            .map_err(|e| CapabilityError::connectivity("Error fetching joke", e))?;
        Ok(format!("{} - {}", joke.setup, joke.punchline))
    }
}
