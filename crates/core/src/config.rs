use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Key lookup with optional profile prefixing.
///
/// With a non-empty profile (e.g. `PROD`), `{PROFILE}_{KEY}` wins over `{KEY}`.
/// Empty values count as unset.
struct EnvSource<'a> {
    profile: String,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvSource<'_> {
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|s| !s.is_empty())
    }

    fn opt(&self, key: &str) -> Option<String> {
        if !self.profile.is_empty() {
            if let Some(v) = self.raw(&format!("{}_{}", self.profile, key)) {
                return Some(v);
            }
        }
        self.raw(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn u16(&self, key: &str, default: u16) -> u16 {
        self.opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn u64(&self, key: &str, default: u64) -> u64 {
        self.opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub postgres: PostgresConfig,
    pub llm: LlmConfig,
    pub apis: ApiConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PARLEY_PROFILE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = lookup("PARLEY_PROFILE")
            .unwrap_or_default()
            .to_uppercase();
        let src = EnvSource {
            profile,
            lookup: &lookup,
        };
        Self {
            profile: src.profile.clone(),
            server: ServerConfig::from_source(&src),
            client: ClientConfig::from_source(&src),
            postgres: PostgresConfig::from_source(&src),
            llm: LlmConfig::from_source(&src),
            apis: ApiConfig::from_source(&src),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!("  postgres:  host={}:{}, db={}", self.postgres.host, self.postgres.port, self.postgres.database);
        tracing::info!("  llm:       model={}, configured={}", self.llm.openai_model, self.llm.is_configured());
        tracing::info!("  geo:       {}", self.apis.geo_url);
        tracing::info!("  weather:   {}", self.apis.weather_url);
        tracing::info!("  joke:      {}", self.apis.joke_url);
        tracing::debug!(config = %self.redacted_summary(), "Effective configuration");
    }

    /// Return a redacted view safe for display (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "client": { "localhost_url": self.client.localhost_url },
            "postgres": {
                "host": self.postgres.host,
                "port": self.postgres.port,
                "database": self.postgres.database,
                "configured": self.postgres.is_configured(),
            },
            "llm": {
                "model": self.llm.openai_model,
                "base_url": self.llm.openai_base_url,
                "configured": self.llm.is_configured(),
            },
            "apis": {
                "geo_url": self.apis.geo_url,
                "weather_url": self.apis.weather_url,
                "joke_url": self.apis.joke_url,
                "timeout_secs": self.apis.http_timeout.as_secs(),
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_source(src: &EnvSource<'_>) -> Self {
        Self {
            host: src.or("HOST", "0.0.0.0"),
            port: src.u16("PORT", 8000),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Client ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the server; the SSE stream lives at `{localhost_url}/sse`.
    pub localhost_url: String,
}

impl ClientConfig {
    fn from_source(src: &EnvSource<'_>) -> Self {
        Self {
            localhost_url: src.or("LOCALHOST_URL", "http://localhost:8000"),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl PostgresConfig {
    fn from_source(src: &EnvSource<'_>) -> Self {
        Self {
            host: src.or("POSTGRES_HOST", "localhost"),
            port: src.u16("POSTGRES_PORT", 5432),
            database: src.or("POSTGRES_DATABASE_NAME", "postgres"),
            username: src.opt("POSTGRES_USERNAME"),
            password: src.opt("POSTGRES_PASSWORD"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.username.is_some()
    }
}

// ── LLM (OpenAI-compatible) ───────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
}

impl LlmConfig {
    fn from_source(src: &EnvSource<'_>) -> Self {
        Self {
            openai_api_key: src.opt("OPENAI_API_KEY"),
            openai_model: src.or("OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: src.or("OPENAI_BASE_URL", "https://api.openai.com"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

// ── Public HTTP APIs ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub geo_url: String,
    pub weather_url: String,
    pub joke_url: String,
    /// Per-request timeout for the geocoding and weather lookups.
    pub http_timeout: Duration,
}

impl ApiConfig {
    fn from_source(src: &EnvSource<'_>) -> Self {
        Self {
            geo_url: src.or("GEO_URL", "https://geocoding-api.open-meteo.com/v1/search"),
            weather_url: src.or("WEATHER_URL", "https://api.open-meteo.com/v1/forecast"),
            joke_url: src.or("JOKE_URL", "https://official-joke-api.appspot.com/random_joke"),
            http_timeout: Duration::from_secs(src.u64("HTTP_TIMEOUT_SECS", 10)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.profile_label(), "default");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.client.localhost_url, "http://localhost:8000");
        assert_eq!(config.postgres.port, 5432);
        assert!(!config.postgres.is_configured());
        assert!(!config.llm.is_configured());
        assert_eq!(config.apis.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_reads_documented_keys() {
        let config = config_from(&[
            ("LOCALHOST_URL", "http://127.0.0.1:9000"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-test"),
            ("GEO_URL", "http://geo"),
            ("WEATHER_URL", "http://weather"),
            ("JOKE_URL", "http://joke"),
            ("POSTGRES_DATABASE_NAME", "quotes"),
            ("POSTGRES_USERNAME", "app"),
            ("POSTGRES_PASSWORD", "secret"),
            ("POSTGRES_HOST", "db"),
            ("POSTGRES_PORT", "6543"),
        ]);
        assert_eq!(config.client.localhost_url, "http://127.0.0.1:9000");
        assert_eq!(config.llm.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.openai_model, "gpt-test");
        assert_eq!(config.apis.geo_url, "http://geo");
        assert_eq!(config.apis.weather_url, "http://weather");
        assert_eq!(config.apis.joke_url, "http://joke");
        assert_eq!(config.postgres.database, "quotes");
        assert_eq!(config.postgres.host, "db");
        assert_eq!(config.postgres.port, 6543);
        assert!(config.postgres.is_configured());
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let config = config_from(&[("OPENAI_API_KEY", "")]);
        assert!(!config.llm.is_configured());
    }

    #[test]
    fn test_profile_prefix_wins() {
        let config = config_from(&[
            ("PARLEY_PROFILE", "prod"),
            ("PROD_PORT", "9100"),
            ("PORT", "9000"),
            ("HOST", "127.0.0.1"),
        ]);
        assert_eq!(config.profile_label(), "PROD");
        assert_eq!(config.server.port, 9100);
        // Falls back to the unprefixed key
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_redacted_summary_hides_secrets() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-secret"), ("POSTGRES_PASSWORD", "pw")]);
        let summary = config.redacted_summary().to_string();
        assert!(!summary.contains("sk-secret"));
        assert!(!summary.contains("\"pw\""));
        assert!(summary.contains("\"configured\":true"));
    }
}
