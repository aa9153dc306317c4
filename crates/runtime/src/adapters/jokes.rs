use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{decode_json, AdapterError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Joke {
    pub setup: String,
    pub punchline: String,
}

#[async_trait]
pub trait JokeSource: Send + Sync {
    async fn random(&self) -> Result<Joke, AdapterError>;
}

/// Fetches one joke per call from a JSON endpoint. No request timeout.
pub struct HttpJokeSource {
    client: reqwest::Client,
    url: String,
}

impl HttpJokeSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl JokeSource for HttpJokeSource {
    async fn random(&self) -> Result<Joke, AdapterError> {
        debug!(url = %self.url, "Fetching joke");
        let resp = self.client.get(&self.url).send().await?;
        decode_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_random_joke() {
        let router = Router::new().route(
            "/random_joke",
            get(|| async {
                Json(json!({
                    "type": "general",
                    "setup": "Why did the scarecrow win an award?",
                    "punchline": "He was outstanding in his field.",
                    "id": 1
                }))
            }),
        );
        let base = serve(router).await;

        let joke = HttpJokeSource::new(format!("{base}/random_joke")).random().await.unwrap();
        assert_eq!(joke.setup, "Why did the scarecrow win an award?");
        assert_eq!(joke.punchline, "He was outstanding in his field.");
    }

    #[tokio::test]
    async fn test_server_error_is_adapter_error() {
        let router = Router::new().route(
            "/random_joke",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let base = serve(router).await;

        let err = HttpJokeSource::new(format!("{base}/random_joke")).random().await.unwrap_err();
        assert!(matches!(err, AdapterError::Http(_)));
    }

    #[tokio::test]
    async fn test_unexpected_body_is_malformed() {
        let router = Router::new().route(
            "/random_joke",
            get(|| async { Json(json!({"type": "general", "id": 7})) }),
        );
        let base = serve(router).await;

        let err = HttpJokeSource::new(format!("{base}/random_joke")).random().await.unwrap_err();
        assert!(matches!(err, AdapterError::Malformed(ref m) if m.contains("setup")));
    }
}
