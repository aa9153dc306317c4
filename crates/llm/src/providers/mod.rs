pub mod openai;

use parley_core::config::LlmConfig;

use crate::provider::{LlmError, LlmProvider};

/// Create the completion provider described by config.
///
/// Fails with [`LlmError::NotConfigured`] when no API key is set.
pub fn create_provider(llm_config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    let api_key = llm_config
        .openai_api_key
        .as_ref()
        .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
    Ok(Box::new(openai::OpenAiProvider::new(
        api_key.clone(),
        llm_config.openai_model.clone(),
        llm_config.openai_base_url.clone(),
    )))
}
