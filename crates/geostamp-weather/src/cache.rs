//! Single-slot freshness cache for the weather summary.

use chrono::{DateTime, Duration, Utc};

/// How long a weather summary (including "Weather unavailable") is reused.
pub const WEATHER_TTL_MS: i64 = 3_600_000;

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherEntry {
    pub time: DateTime<Utc>,
    pub value: String,
}

/// Remembers the last weather summary and when it was fetched.
///
/// Failures are stored like successes so an outage is not hammered.
#[derive(Debug)]
pub struct WeatherCache {
    entry: Option<WeatherEntry>,
    ttl: Duration,
}

impl Default for WeatherCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherCache {
    pub fn new() -> Self {
        Self {
            entry: None,
            ttl: Duration::milliseconds(WEATHER_TTL_MS),
        }
    }

    /// The cached summary if it is younger than the TTL at `now`.
    pub fn get(&self, now: DateTime<Utc>) -> Option<&str> {
        self.entry
            .as_ref()
            .filter(|e| now - e.time < self.ttl)
            .map(|e| e.value.as_str())
    }

    pub fn store(&mut self, time: DateTime<Utc>, value: impl Into<String>) {
        self.entry = Some(WeatherEntry {
            time,
            value: value.into(),
        });
    }

    pub fn entry(&self) -> Option<&WeatherEntry> {
        self.entry.as_ref()
    }
}
