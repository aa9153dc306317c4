//! Built-in capabilities.
//!
//! - **Tools**: `add`, `get_weather`, `random_joke`
//! - **Resources**: `quote://{quote_id}`
//! - **Prompts**: `ask_llm`

pub mod add;
pub mod ask_llm;
pub mod joke;
pub mod quote;
pub mod weather;

use std::sync::Arc;

use parley_core::Config;
use parley_llm::LlmProvider;

use crate::adapters::{
    AdapterError, HttpJokeSource, JokeSource, OpenMeteoClient, PgQuoteStore, QuoteStore,
    WeatherApi,
};
use crate::registry::{CapabilityRegistry, RegistryError};

pub use add::AddTool;
pub use ask_llm::AskLlmPrompt;
pub use joke::JokeTool;
pub use quote::QuoteResource;
pub use weather::WeatherTool;

/// External collaborators the built-in handlers call into.
#[derive(Clone)]
pub struct Adapters {
    pub weather: Arc<dyn WeatherApi>,
    pub jokes: Arc<dyn JokeSource>,
    pub quotes: Arc<dyn QuoteStore>,
    /// `None` when no completion credential is configured.
    pub llm: Option<Arc<dyn LlmProvider>>,
}

impl Adapters {
    /// Production adapters built from config.
    pub fn from_config(config: &Config, llm: Option<Arc<dyn LlmProvider>>) -> Result<Self, AdapterError> {
        Ok(Self {
            weather: Arc::new(OpenMeteoClient::new(&config.apis)?),
            jokes: Arc::new(HttpJokeSource::new(config.apis.joke_url.clone())),
            quotes: Arc::new(PgQuoteStore::new(&config.postgres)),
            llm,
        })
    }
}

/// Register every built-in tool, resource and prompt.
pub fn register_builtin(
    registry: &mut CapabilityRegistry,
    adapters: &Adapters,
) -> Result<(), RegistryError> {
    registry.register(AddTool)?;
    registry.register(WeatherTool::new(adapters.weather.clone()))?;
    registry.register(JokeTool::new(adapters.jokes.clone()))?;
    registry.register(QuoteResource::new(adapters.quotes.clone()))?;
    registry.register(AskLlmPrompt::new(adapters.llm.clone()))?;
    tracing::info!(
        tools = registry.count(crate::Category::Tool),
        resources = registry.count(crate::Category::Resource),
        prompts = registry.count(crate::Category::Prompt),
        "Built-in capabilities registered"
    );
    Ok(())
}
