use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::QuoteStore;
use crate::capability::{
    arg_i64, Arguments, Capability, CapabilityDescriptor, CapabilityError, ParamSpec, ParamType,
};

/// Resource `quote://{quote_id}`: quote text by id.
pub struct QuoteResource {
    store: Arc<dyn QuoteStore>,
}

impl QuoteResource {
    pub fn new(store: Arc<dyn QuoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Capability for QuoteResource {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::resource("get_quote", "quote://{quote_id}", "Read a stored quote by id.")
            .param(ParamSpec::required("quote_id", ParamType::Integer))
    }

    async fn invoke(&self, args: &Arguments) -> Result<String, CapabilityError> {
        let id = arg_i64(args, "quote_id")?;
        self.store
            .fetch_quote(id)
            .await
            .map_err(|e| CapabilityError::connectivity("DB Error", e))?
            .ok_or_else(|| CapabilityError::NotFound(format!("No quote found for ID {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{AdapterError, InMemoryQuoteStore};
    use serde_json::json;

    fn quote_id(id: i64) -> Arguments {
        json!({"quote_id": id}).as_object().cloned().unwrap()
    }

    struct BrokenStore;

    #[async_trait]
    impl QuoteStore for BrokenStore {
        async fn fetch_quote(&self, _id: i64) -> Result<Option<String>, AdapterError> {
            Err(AdapterError::Malformed("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_quote_found() {
        let resource = QuoteResource::new(Arc::new(InMemoryQuoteStore::new().with_quote(1, "Hello")));
        assert_eq!(resource.invoke(&quote_id(1)).await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_quote_missing() {
        let resource = QuoteResource::new(Arc::new(InMemoryQuoteStore::new().with_quote(1, "Hello")));
        let err = resource.invoke(&quote_id(999)).await.unwrap_err();
        assert_eq!(err.to_string(), "No quote found for ID 999");
    }

    #[tokio::test]
    async fn test_db_fault() {
        let err = QuoteResource::new(Arc::new(BrokenStore))
            .invoke(&quote_id(1))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("DB Error: "));
    }
}
