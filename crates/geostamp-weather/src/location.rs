//! Position lookup and saved-place matching.

use std::future::Future;

use crate::distance::distance_meters;
use crate::types::{Coordinates, LocationError, Position, SavedLocation};

/// A saved place matches when the position is at most this far away.
pub const SAVED_MATCH_METERS: f64 = 100.0;

/// Receives progress messages meant for a status line.
pub trait StatusSink {
    fn update(&self, message: &str);
}

impl<F: Fn(&str)> StatusSink for F {
    fn update(&self, message: &str) {
        self(message)
    }
}

/// Sends status messages to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn update(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// A source of the device's current position.
pub trait Geolocator: Send + Sync {
    fn current_position(&self) -> impl Future<Output = Result<Position, LocationError>> + Send;
}

/// Geolocator backed by a fixed, configured position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredGeolocator {
    position: Option<Position>,
}

impl ConfiguredGeolocator {
    pub fn new(position: Option<Position>) -> Self {
        Self { position }
    }

    pub fn from_config(config: &geostamp_core::PositionConfig) -> Self {
        Self::new(config.coordinates().map(|(lat, lon)| Position::new(lat, lon)))
    }
}

impl Geolocator for ConfiguredGeolocator {
    async fn current_position(&self) -> Result<Position, LocationError> {
        self.position.ok_or(LocationError::ServiceUnavailable)
    }
}

/// Ask the geolocator once; fall back to `(0, 0)` on failure.
pub async fn get_position<G, S>(geolocator: &G, status: &S) -> Position
where
    G: Geolocator + ?Sized,
    S: StatusSink + ?Sized,
{
    status.update("Getting location...");
    match geolocator.current_position().await {
        Ok(position) => {
            tracing::debug!("Got location: {}, {}", position.latitude, position.longitude);
            position
        }
        Err(e) => {
            tracing::warn!("Geolocation failed: {}", e);
            status.update("Error: Could not get location.");
            Position::unknown()
        }
    }
}

/// First saved place within [`SAVED_MATCH_METERS`], in list order.
pub fn match_saved_location(coords: Coordinates, saved: &[SavedLocation]) -> Option<&SavedLocation> {
    saved
        .iter()
        .find(|loc| distance_meters(coords, loc.coords) <= SAVED_MATCH_METERS)
}
