pub mod config;
pub mod error;

pub use config::{
    ClipboardBackend, ClipboardConfig, Config, GeocodeConfig, LocationsConfig, OfflineConfig,
    PositionConfig, SavedLocationConfig, ValidationResult, WeatherConfig,
};
pub use error::{
    AppError, ConfigError, NetworkError, ReqwestErrorExt, RusqliteErrorExt, StorageError,
};

use anyhow::Result;

/// Initialize logging for the process.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::info!("geostamp core initialized");
    Ok(())
}
