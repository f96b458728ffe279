use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::WeatherProvider;
use crate::core::config::settings::WeatherSettings;
use crate::core::errors::ApiError;

const MISSING: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    Metric,
    Imperial,
    Standard,
}

impl UnitSystem {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "imperial" => UnitSystem::Imperial,
            "standard" => UnitSystem::Standard,
            _ => UnitSystem::Metric,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
            UnitSystem::Standard => "standard",
        }
    }

    fn temperature_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
            UnitSystem::Standard => " K",
        }
    }

    fn speed_suffix(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => " mph",
            UnitSystem::Metric | UnitSystem::Standard => " m/s",
        }
    }
}

/// OpenWeatherMap current weather payload; every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sys: Option<SystemInfo>,
    #[serde(default)]
    pub main: Option<MainReadings>,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub wind: Option<Wind>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemInfo {
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MainReadings {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Condition {
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
}

fn or_missing<T: Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

fn with_suffix<T: Display>(value: Option<T>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{}{}", v, suffix),
        None => MISSING.to_string(),
    }
}

/// Render a report as the multi-line summary shown to users.
pub fn format_weather(report: &WeatherReport, units: UnitSystem) -> String {
    let city = report.name.as_deref().unwrap_or("Unknown");
    let country = report
        .sys
        .as_ref()
        .and_then(|s| s.country.as_deref())
        .unwrap_or("");
    let main = report.main.clone().unwrap_or_default();
    let description = report
        .weather
        .first()
        .and_then(|c| c.description.clone());
    let wind_speed = report.wind.as_ref().and_then(|w| w.speed);

    format!(
        "\nCurrent Weather in {city}, {country}:\n\
         - Temperature: {temp}\n\
         - Feels like: {feels}\n\
         - Conditions: {conditions}\n\
         - Humidity: {humidity}\n\
         - Wind Speed: {wind}\n",
        temp = with_suffix(main.temp, units.temperature_suffix()),
        feels = with_suffix(main.feels_like, units.temperature_suffix()),
        conditions = or_missing(description),
        humidity = with_suffix(main.humidity, "%"),
        wind = with_suffix(wind_speed, units.speed_suffix()),
    )
}

#[derive(Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    api_key: String,
    units: UnitSystem,
    client: Client,
}

impl OpenWeatherClient {
    pub fn new(settings: &WeatherSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            units: UnitSystem::from_str(&settings.units),
            client,
        })
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// Raw current weather for a city name.
    pub async fn get_weather_by_city(&self, city: &str) -> Result<WeatherReport, ApiError> {
        let res = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await
            .map_err(ApiError::upstream)?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!("city not found: {}", city)));
        }
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "OpenWeatherMap {}: {}",
                status,
                text.trim()
            )));
        }

        res.json::<WeatherReport>()
            .await
            .map_err(|e| ApiError::Upstream(format!("Failed to parse weather response: {}", e)))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    fn name(&self) -> &str {
        "openweathermap"
    }

    async fn current_weather(&self, city: &str) -> Result<String, ApiError> {
        let report = self.get_weather_by_city(city).await?;
        Ok(format_weather(&report, self.units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn london() -> serde_json::Value {
        json!({
            "name": "London",
            "sys": { "country": "GB" },
            "main": { "temp": 15.2, "feels_like": 14.5, "humidity": 76 },
            "weather": [{ "description": "cloudy" }],
            "wind": { "speed": 5.1 }
        })
    }

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(&WeatherSettings {
            api_key: "ow-key".to_string(),
            base_url: format!("{}/data/2.5/weather", server.uri()),
            ..WeatherSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn format_weather_includes_every_reading() {
        let report: WeatherReport = serde_json::from_value(london()).unwrap();
        let formatted = format_weather(&report, UnitSystem::Metric);

        assert!(formatted.contains("London"));
        assert!(formatted.contains("GB"));
        assert!(formatted.contains("15.2°C"));
        assert!(formatted.contains("14.5°C"));
        assert!(formatted.contains("cloudy"));
        assert!(formatted.contains("76%"));
        assert!(formatted.contains("5.1 m/s"));
    }

    #[test]
    fn format_weather_marks_missing_fields() {
        let formatted = format_weather(&WeatherReport::default(), UnitSystem::Metric);
        assert!(formatted.contains("Current Weather in Unknown, :"));
        assert!(formatted.contains("- Temperature: N/A"));
        assert!(formatted.contains("- Wind Speed: N/A"));
    }

    #[test]
    fn imperial_units_change_suffixes() {
        let report: WeatherReport = serde_json::from_value(london()).unwrap();
        let formatted = format_weather(&report, UnitSystem::Imperial);
        assert!(formatted.contains("15.2°F"));
        assert!(formatted.contains("5.1 mph"));
    }

    #[test]
    fn standard_units_use_kelvin_and_metres_per_second() {
        let report: WeatherReport = serde_json::from_value(london()).unwrap();
        let formatted = format_weather(&report, UnitSystem::Standard);
        assert!(formatted.contains("- Temperature: 15.2 K"));
        assert!(formatted.contains("- Feels like: 14.5 K"));
        assert!(formatted.contains("- Wind Speed: 5.1 m/s"));
    }

    #[tokio::test]
    async fn get_weather_by_city_sends_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "London"))
            .and(query_param("appid", "ow-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london()))
            .expect(1)
            .mount(&server)
            .await;

        let report = client_for(&server).get_weather_by_city("London").await.unwrap();

        assert_eq!(report.name.as_deref(), Some("London"));
        assert_eq!(report.main.and_then(|m| m.temp), Some(15.2));
    }

    #[tokio::test]
    async fn unknown_city_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"cod": "404", "message": "city not found"})))
            .mount(&server)
            .await;

        let err = client_for(&server).current_weather("Atlantis").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn bad_key_maps_to_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let err = client_for(&server).current_weather("London").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
