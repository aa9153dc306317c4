//! Clients for the external systems behind the built-in handlers.
//!
//! Each adapter sits behind a trait so handlers can be exercised without
//! network or database access.

pub mod jokes;
pub mod quotes;
pub mod weather;

pub use jokes::{HttpJokeSource, Joke, JokeSource};
pub use quotes::{InMemoryQuoteStore, PgQuoteStore, QuoteStore};
pub use weather::{Coordinates, CurrentWeather, OpenMeteoClient, WeatherApi};

use serde::de::DeserializeOwned;

/// Fault raised by an adapter. Handlers turn it into caller-facing text.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Decode a successful JSON body. A body of the wrong shape is `Malformed`.
async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, AdapterError> {
    let body = resp.error_for_status()?.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| AdapterError::Malformed(e.to_string()))
}
