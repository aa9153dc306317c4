use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::WeatherApi;
use crate::capability::{
    arg_str, Arguments, Capability, CapabilityDescriptor, CapabilityError, ParamSpec, ParamType,
};

const CONTEXT: &str = "Error getting weather";

/// `get_weather(city)`: current temperature and wind speed via geocoding + forecast lookups.
pub struct WeatherTool {
    api: Arc<dyn WeatherApi>,
}

impl WeatherTool {
    pub fn new(api: Arc<dyn WeatherApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Capability for WeatherTool {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::tool("get_weather", "Fetch the current weather for a city.")
            .param(ParamSpec::required("city", ParamType::String).describe("City name"))
    }

    async fn invoke(&self, args: &Arguments) -> Result<String, CapabilityError> {
        let city = arg_str(args, "city")?;

        let at = self
            .api
            .geocode(city)
            .await
            .map_err(|e| CapabilityError::connectivity(CONTEXT, e))?
            .ok_or_else(|| CapabilityError::NotFound(format!("City '{city}' not found.")))?;

        let now = self
            .api
            .current(at)
            .await
            .map_err(|e| CapabilityError::connectivity(CONTEXT, e))?;

        Ok(format!(
            "Temperature in {city} is {}°C with wind speed {} km/h.",
            now.temperature, now.windspeed
        ))
    }
}
