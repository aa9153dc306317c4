use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info};

use parley_core::config::PostgresConfig;

use super::AdapterError;

/// Read-only access to stored quotes.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Quote text for `id`, or `None` when no row exists.
    async fn fetch_quote(&self, id: i64) -> Result<Option<String>, AdapterError>;
}

/// PostgreSQL-backed store. Opens one connection per lookup and closes it afterwards.
pub struct PgQuoteStore {
    options: PgConnectOptions,
}

impl PgQuoteStore {
    pub fn new(config: &PostgresConfig) -> Self {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database);
        if let Some(user) = &config.username {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        Self { options }
    }

    async fn connect(&self) -> Result<PgConnection, AdapterError> {
        Ok(PgConnection::connect_with(&self.options).await?)
    }

    /// Apply the bundled migrations (creates and seeds `quotes`).
    pub async fn migrate(&self) -> Result<(), AdapterError> {
        let mut conn = self.connect().await?;
        sqlx::migrate!("../../migrations").run(&mut conn).await?;
        conn.close().await?;
        info!("Database migrations applied successfully");
        Ok(())
    }
}

#[async_trait]
impl QuoteStore for PgQuoteStore {
    async fn fetch_quote(&self, id: i64) -> Result<Option<String>, AdapterError> {
        debug!(id, "Querying quote");
        let mut conn = self.connect().await?;
        let row = sqlx::query_scalar::<_, String>("SELECT quote FROM quotes WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut conn)
            .await;
        conn.close().await?;
        Ok(row?)
    }
}

/// Map-backed store for tests and offline demos.
#[derive(Debug, Default)]
pub struct InMemoryQuoteStore {
    quotes: HashMap<i64, String>,
}

impl InMemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, id: i64, text: impl Into<String>) -> Self {
        self.quotes.insert(id, text.into());
        self
    }
}

#[async_trait]
impl QuoteStore for InMemoryQuoteStore {
    async fn fetch_quote(&self, id: i64) -> Result<Option<String>, AdapterError> {
        Ok(self.quotes.get(&id).cloned())
    }
}
