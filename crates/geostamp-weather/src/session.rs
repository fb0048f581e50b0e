//! Long-lived lookup state for one running instance.
//!
//! A [`Session`] owns the geocode and weather caches. Both are single slots
//! guarded by short, non-async locks: concurrent calls may interleave, and
//! whichever lookup finishes last overwrites the slot even if it started
//! first.

use std::sync::Arc;

use chrono::Local;
use geostamp_core::Config;
use parking_lot::Mutex;

use crate::cache::WeatherCache;
use crate::geocode::{coordinate_label, GeocodeCache, NominatimClient};
use crate::location::{get_position, match_saved_location, Geolocator, StatusSink};
use crate::provider::{OpenMeteoClient, WEATHER_UNAVAILABLE};
use crate::stamp::{format_timestamp, Stamp};
use crate::types::{Clock, Coordinates, Position, SavedLocation, SystemClock, WeatherError};

pub struct Session {
    geocoder: NominatimClient,
    forecaster: OpenMeteoClient,
    clock: Arc<dyn Clock>,
    geocode_cache: Mutex<GeocodeCache>,
    weather_cache: Mutex<WeatherCache>,
}

impl Session {
    pub fn new(geocoder: NominatimClient, forecaster: OpenMeteoClient) -> Self {
        Self {
            geocoder,
            forecaster,
            clock: Arc::new(SystemClock),
            geocode_cache: Mutex::new(GeocodeCache::new()),
            weather_cache: Mutex::new(WeatherCache::new()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, WeatherError> {
        let geocoder = NominatimClient::new(&config.geocode.base_url, &config.geocode.user_agent)?;
        let forecaster = OpenMeteoClient::new(&config.weather.base_url)?;
        Ok(Self::new(geocoder, forecaster))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Address for a point, from the proximity cache when possible.
    ///
    /// Never fails: lookup problems yield `"(lat, lon)"`, which is cached too.
    pub async fn get_address(&self, lat: f64, lon: f64) -> String {
        let coords = Coordinates::new(lat, lon);

        let cached = self.geocode_cache.lock().lookup(coords).map(str::to_string);
        if let Some(address) = cached {
            tracing::debug!("Geocode cache hit for ({}, {})", lat, lon);
            return address;
        }

        let address = match self.geocoder.reverse(coords).await {
            Ok(Some(name)) => name,
            Ok(None) => {
                tracing::error!("Geo-reversing: address not found.");
                coordinate_label(coords)
            }
            Err(e) => {
                tracing::error!("Geo-reversing failure: {}", e);
                coordinate_label(coords)
            }
        };

        self.geocode_cache.lock().store(coords, address.clone());
        address
    }

    /// Weather summary, reused for up to an hour.
    ///
    /// Never fails: any problem yields `"Weather unavailable"`, which is cached
    /// for the same hour.
    pub async fn get_weather(&self, position: &Position) -> String {
        let now = self.clock.now();

        let cached = self.weather_cache.lock().get(now).map(str::to_string);
        if let Some(value) = cached {
            tracing::debug!("Weather cache hit");
            return value;
        }

        let value = match self.forecaster.current(position.coordinates()).await {
            Ok(Some(current)) => current.summary(),
            Ok(None) => WEATHER_UNAVAILABLE.to_string(),
            Err(e) => {
                tracing::error!("Weather failed: {}", e);
                WEATHER_UNAVAILABLE.to_string()
            }
        };

        self.weather_cache.lock().store(now, value.clone());
        value
    }

    /// `"at {label}"` for the first saved place within range, else
    /// `"at {address}"` from reverse geocoding.
    pub async fn identify_position<S>(
        &self,
        position: &Position,
        saved: &[SavedLocation],
        status: &S,
    ) -> String
    where
        S: StatusSink + ?Sized,
    {
        if let Some(place) = match_saved_location(position.coordinates(), saved) {
            return format!("at {}", place.label);
        }

        status.update("No saved match. Looking up address...");
        let address = self.get_address(position.latitude, position.longitude).await;
        format!("at {}", address)
    }

    /// Resolve position, place and weather into one [`Stamp`].
    pub async fn compose<G, S>(&self, geolocator: &G, saved: &[SavedLocation], status: &S) -> Stamp
    where
        G: Geolocator + ?Sized,
        S: StatusSink + ?Sized,
    {
        let timestamp = format_timestamp(&self.clock.now().with_timezone(&Local));
        let position = get_position(geolocator, status).await;

        let (location, weather) = tokio::join!(
            self.identify_position(&position, saved, status),
            self.get_weather(&position)
        );

        Stamp {
            timestamp,
            location,
            weather,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("geocoder", &self.geocoder)
            .field("forecaster", &self.forecaster)
            .finish_non_exhaustive()
    }
}
