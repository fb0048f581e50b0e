//! Location and weather lookups for geostamp.
//!
//! Resolves a position to a saved place or a reverse-geocoded address and
//! fetches a weather summary from Open-Meteo, with single-slot caches owned
//! by a [`Session`].

pub mod cache;
pub mod distance;
pub mod geocode;
pub mod location;
pub mod provider;
pub mod session;
pub mod stamp;
pub mod types;

pub use cache::WeatherCache;
pub use geocode::{GeocodeCache, NominatimClient};
pub use location::{get_position, ConfiguredGeolocator, Geolocator, StatusSink, TracingStatus};
pub use provider::{CurrentWeather, OpenMeteoClient, WEATHER_UNAVAILABLE};
pub use session::Session;
pub use stamp::{format_number, format_timestamp, Stamp};
pub use types::*;
