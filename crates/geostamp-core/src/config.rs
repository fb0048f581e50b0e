use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a one-line summary of all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding config.toml and the offline cache database
    pub config_dir: PathBuf,

    /// Reverse geocoding endpoint
    #[serde(default)]
    pub geocode: GeocodeConfig,

    /// Forecast endpoint
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Labelled places matched before reverse geocoding
    #[serde(default)]
    pub locations: LocationsConfig,

    /// Fixed position used in place of a platform geolocation service
    #[serde(default)]
    pub position: PositionConfig,

    /// Offline asset cache (worker) settings
    #[serde(default)]
    pub offline: OfflineConfig,

    #[serde(default)]
    pub clipboard: ClipboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("geostamp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocationConfig {
    pub label: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationsConfig {
    /// Checked in order; the first one close enough wins
    #[serde(default)]
    pub saved: Vec<SavedLocationConfig>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PositionConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PositionConfig {
    /// Both coordinates, when configured
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Versioned store name. Change it whenever `precache` changes.
    pub cache_name: String,
    /// Base URL the worker serves; relative manifest entries resolve against it
    pub scope_url: String,
    /// Document served when a navigation request fails
    pub offline_url: String,
    /// Assets fetched and stored at install time
    #[serde(default)]
    pub precache: Vec<String>,
    /// SQLite file name inside `config_dir`
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_database_file() -> String {
    "offline-cache.sqlite3".to_string()
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            cache_name: "geo-timestamp-cache-v1".to_string(),
            scope_url: "http://localhost:8080/".to_string(),
            offline_url: "index.html".to_string(),
            precache: vec![
                "./index.html".to_string(),
                "./index.js".to_string(),
                "./manifest.json".to_string(),
                "./icon-256.png".to_string(),
            ],
            database_file: default_database_file(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardBackend {
    /// OSC 52 escape sequence written to the terminal
    #[default]
    Osc52,
    /// In-process clipboard; nothing leaves the program
    Memory,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ClipboardConfig {
    #[serde(default)]
    pub backend: ClipboardBackend,
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geostamp")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            geocode: GeocodeConfig::default(),
            weather: WeatherConfig::default(),
            locations: LocationsConfig::default(),
            position: PositionConfig::default(),
            offline: OfflineConfig::default(),
            clipboard: ClipboardConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Validate a loaded configuration and reject it if validation reports errors.
    ///
    /// Warnings are logged and returned alongside the config.
    pub fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.geocode.base_url, "geocode.base_url", &mut result);
        validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.geocode.user_agent.trim().is_empty() {
            result.add_error("geocode.user_agent", "User agent must not be empty");
        }

        for (i, loc) in self.locations.saved.iter().enumerate() {
            let field = format!("locations.saved[{}]", i);
            if loc.label.trim().is_empty() {
                result.add_error(&field, "Label must not be empty");
            }
            validate_coordinates(loc.lat, loc.lon, &field, &mut result);
        }

        match (self.position.latitude, self.position.longitude) {
            (Some(lat), Some(lon)) => validate_coordinates(lat, lon, "position", &mut result),
            (None, None) => {}
            _ => result.add_error(
                "position",
                "Both latitude and longitude must be set, or neither",
            ),
        }

        self.validate_offline(&mut result);

        result
    }

    fn validate_offline(&self, result: &mut ValidationResult) {
        let offline = &self.offline;

        if offline.cache_name.trim().is_empty() {
            result.add_error("offline.cache_name", "Cache name must not be empty");
        }

        validate_url(&offline.scope_url, "offline.scope_url", result);

        if offline.precache.is_empty() {
            result.add_warning(
                "offline.precache",
                "Precache manifest is empty - nothing will be available offline",
            );
        }

        let Ok(scope) = Url::parse(&offline.scope_url) else {
            return;
        };

        let mut resolved = Vec::with_capacity(offline.precache.len());
        for entry in &offline.precache {
            match scope.join(entry) {
                Ok(url) => resolved.push(url),
                Err(e) => result.add_error(
                    "offline.precache",
                    format!("Invalid manifest entry {:?}: {}", entry, e),
                ),
            }
        }

        match scope.join(&offline.offline_url) {
            Ok(url) if !resolved.contains(&url) => result.add_warning(
                "offline.offline_url",
                format!("{} is not in the precache manifest", url),
            ),
            Ok(_) => {}
            Err(e) => result.add_error("offline.offline_url", format!("Invalid URL: {}", e)),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path to the offline cache database
    pub fn offline_database_path(&self) -> PathBuf {
        self.config_dir.join(&self.offline.database_file)
    }

    /// Path to the configuration file
    pub fn config_path() -> PathBuf {
        default_config_dir().join("config.toml")
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

fn validate_coordinates(lat: f64, lon: f64, field: &str, result: &mut ValidationResult) {
    if !(-90.0..=90.0).contains(&lat) {
        result.add_error(field, format!("Latitude out of range: {}", lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        result.add_error(field, format!("Longitude out of range: {}", lon));
    }
}
