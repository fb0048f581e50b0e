//! Open-Meteo current-weather lookups.

use std::time::Duration;

use geostamp_core::{NetworkError, ReqwestErrorExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::stamp::format_number;
use crate::types::{describe_weather_code, Coordinates, WeatherError};

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com";
pub const WEATHER_UNAVAILABLE: &str = "Weather unavailable";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
}

/// The `current_weather` block of a forecast.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentWeather {
    pub temperature: f64,
    pub weathercode: i32,
    pub windspeed: f64,
}

impl CurrentWeather {
    /// One-line summary, e.g. `Weather: 12.5°C, Overcast, wind 7 km/h`.
    pub fn summary(&self) -> String {
        format!(
            "Weather: {}°C, {}, wind {} km/h",
            format_number(self.temperature),
            describe_weather_code(self.weathercode),
            format_number(self.windspeed)
        )
    }
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch current conditions. `Ok(None)` when the forecast has no current block.
    #[instrument(skip(self), level = "debug")]
    pub async fn current(&self, coords: Coordinates) -> Result<Option<CurrentWeather>, NetworkError> {
        let url = format!(
            "{}/v1/forecast?latitude={}&longitude={}&current_weather=true",
            self.base_url, coords.lat, coords.lon
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message: format!("forecast returned {}", status),
            });
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;

        Ok(body.current_weather)
    }
}
