use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use parley_core::config::ApiConfig;

use super::{decode_json, AdapterError};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CurrentWeather {
    /// Degrees Celsius.
    pub temperature: f64,
    /// km/h.
    pub windspeed: f64,
}

/// Geocoding plus current-conditions lookup.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    /// First match for `city`, or `None` when the geocoder knows no such place.
    async fn geocode(&self, city: &str) -> Result<Option<Coordinates>, AdapterError>;

    async fn current(&self, at: Coordinates) -> Result<CurrentWeather, AdapterError>;
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Option<Vec<Coordinates>>,
}

#[derive(Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

/// Open-Meteo geocoding and forecast endpoints. Both requests carry a timeout.
pub struct OpenMeteoClient {
    client: reqwest::Client,
    geo_url: String,
    weather_url: String,
}

impl OpenMeteoClient {
    pub fn new(config: &ApiConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            client,
            geo_url: config.geo_url.clone(),
            weather_url: config.weather_url.clone(),
        })
    }
}

#[async_trait]
impl WeatherApi for OpenMeteoClient {
    async fn geocode(&self, city: &str) -> Result<Option<Coordinates>, AdapterError> {
        debug!(city = %city, "Geocoding");
        let resp = self
            .client
            .get(&self.geo_url)
            .query(&[("name", city), ("count", "1")])
            .send()
            .await?;
        let resp: GeocodeResponse = decode_json(resp).await?;

        Ok(resp.results.and_then(|r| r.into_iter().next()))
    }

    async fn current(&self, at: Coordinates) -> Result<CurrentWeather, AdapterError> {
        debug!(lat = at.latitude, lon = at.longitude, "Fetching current weather");
        let resp = self
            .client
            .get(&self.weather_url)
            .query(&[
                ("latitude", at.latitude.to_string()),
                ("longitude", at.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await?;
        let resp: ForecastResponse = decode_json(resp).await?;

        Ok(resp.current_weather)
    }
}
