//! Reverse geocoding: convert coordinates to human-readable place names.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.

use std::time::Duration;

use geostamp_core::{NetworkError, ReqwestErrorExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::distance::distance_meters;
use crate::stamp::format_number;
use crate::types::{Coordinates, WeatherError};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// A cached address stays valid for queries closer than this to where it was looked up.
pub const PROXIMITY_METERS: f64 = 200.0;

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
}

/// Text used in place of an address when none is available.
pub fn coordinate_label(coords: Coordinates) -> String {
    format!("({}, {})", format_number(coords.lat), format_number(coords.lon))
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Look up the display name for a point.
    ///
    /// `Ok(None)` means the provider answered but had no display name.
    #[instrument(skip(self), level = "debug")]
    pub async fn reverse(&self, coords: Coordinates) -> Result<Option<String>, NetworkError> {
        let url = format!(
            "{}/reverse?format=json&lat={}&lon={}",
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
                message: format!("reverse geocode returned {}", status),
            });
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;

        Ok(body.display_name.filter(|name| !name.is_empty()))
    }
}

/// The most recent reverse-geocode result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeEntry {
    pub coords: Coordinates,
    pub address: String,
}

/// Single-slot proximity cache for reverse-geocoded addresses.
///
/// Only the last lookup is remembered. It answers any query within
/// [`PROXIMITY_METERS`] of where it was made; anything further away is a miss
/// and the next stored entry replaces it.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entry: Option<GeocodeEntry>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, coords: Coordinates) -> Option<&str> {
        self.entry
            .as_ref()
            .filter(|e| distance_meters(coords, e.coords) < PROXIMITY_METERS)
            .map(|e| e.address.as_str())
    }

    pub fn store(&mut self, coords: Coordinates, address: impl Into<String>) {
        self.entry = Some(GeocodeEntry {
            coords,
            address: address.into(),
        });
    }

    pub fn entry(&self) -> Option<&GeocodeEntry> {
        self.entry.as_ref()
    }
}
