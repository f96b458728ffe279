use async_trait::async_trait;

use super::WeatherProvider;
use crate::core::errors::ApiError;

pub struct MockWeather;

#[async_trait]
impl WeatherProvider for MockWeather {
    fn name(&self) -> &str {
        "mock"
    }

    async fn current_weather(&self, city: &str) -> Result<String, ApiError> {
        Ok(format!(
            "Mock weather data for {city}:\n\
             - Temperature: 22°C\n\
             - Feels like: 24°C\n\
             - Humidity: 45%\n\
             - Conditions: Partly cloudy\n\
             - Wind speed: 5 m/s\n"
        ))
    }
}
