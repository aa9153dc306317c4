use std::sync::Arc;

use async_trait::async_trait;

use parley_llm::{LlmProvider, Message};

use crate::capability::{
    arg_str, Arguments, Capability, CapabilityDescriptor, CapabilityError, ParamSpec, ParamType,
};

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Prompt `ask_llm(query)`: one chat completion for the query.
pub struct AskLlmPrompt {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl AskLlmPrompt {
    /// `None` means no credential is configured; invocations then fail without calling out.
    pub fn new(provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Capability for AskLlmPrompt {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::prompt("ask_llm", "Uses OpenAI GPT to answer the query.")
            .param(ParamSpec::required("query", ParamType::String))
    }

    async fn invoke(&self, args: &Arguments) -> Result<String, CapabilityError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| CapabilityError::Configuration("Missing OpenAI API key.".into()))?;
        let query = arg_str(args, "query")?;

        provider
            .complete(vec![Message::system(SYSTEM_PROMPT), Message::user(query)])
            .await
            .map_err(|e| CapabilityError::connectivity("Error querying LLM", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_llm::{LlmError, Role};
    use serde_json::json;

    struct Scripted;

    #[async_trait]
    impl LlmProvider for Scripted {
        async fn complete(&self, messages: Vec<Message>) -> Result<String, LlmError> {
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].role, Role::System);
            assert_eq!(messages[0].content, SYSTEM_PROMPT);
            Ok(format!("You asked: {}", messages[1].content))
        }
    }

    struct Unauthorized;

    #[async_trait]
    impl LlmProvider for Unauthorized {
        async fn complete(&self, _messages: Vec<Message>) -> Result<String, LlmError> {
            Err(LlmError::ApiError { status: 401, body: "invalid key".into() })
        }
    }

    fn query(q: &str) -> Arguments {
        json!({"query": q}).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_missing_key() {
        let err = AskLlmPrompt::new(None).invoke(&query("hi")).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing OpenAI API key.");
    }

    #[tokio::test]
    async fn test_answer() {
        let text = AskLlmPrompt::new(Some(Arc::new(Scripted)))
            .invoke(&query("What are quantum computers?"))
            .await
            .unwrap();
        assert_eq!(text, "You asked: What are quantum computers?");
    }

    #[tokio::test]
    async fn test_provider_fault() {
        let err = AskLlmPrompt::new(Some(Arc::new(Unauthorized)))
            .invoke(&query("hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error querying LLM: "));
    }
}
