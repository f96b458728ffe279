//! Current-weather lookup.
//!
//! - `OpenWeatherClient`: OpenWeatherMap current weather endpoint
//! - `MockWeather`: canned report used without credentials or in mock mode

mod mock;
mod openweather;

use async_trait::async_trait;

use crate::core::errors::ApiError;

pub use mock::MockWeather;
pub use openweather::{format_weather, OpenWeatherClient, UnitSystem, WeatherReport};

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Human-readable current weather for `city`.
    async fn current_weather(&self, city: &str) -> Result<String, ApiError>;
}

/// Formatted weather for `city`; failures are rendered into the text.
pub async fn get_weather(provider: &dyn WeatherProvider, city: &str) -> String {
    match provider.current_weather(city).await {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!("Weather lookup for {} via {} failed: {}", city, provider.name(), err);
            format!("Error fetching weather data: {}", err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWeather;

    #[async_trait]
    impl WeatherProvider for FailingWeather {
        fn name(&self) -> &str {
            "failing"
        }

        async fn current_weather(&self, _city: &str) -> Result<String, ApiError> {
            Err(ApiError::Upstream("API error".to_string()))
        }
    }

    #[tokio::test]
    async fn get_weather_renders_errors_as_text() {
        let text = get_weather(&FailingWeather, "NonexistentCity").await;
        assert!(text.contains("Error"));
        assert!(text.contains("API error"));
    }

    #[tokio::test]
    async fn get_weather_passes_reports_through() {
        let text = get_weather(&MockWeather, "London").await;
        assert!(text.contains("London"));
        assert!(text.contains("22°C"));
    }
}
