use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use geostamp_clipboard::{
    ClipboardError, ClipboardPlatform, ClipboardTransaction, DeferredError, MemoryClipboard,
    Osc52Clipboard,
};
use geostamp_core::{
    AppError, ClipboardBackend, Config, ConfigError, NetworkError, StorageError,
};
use geostamp_offline::{
    CacheStorage, FetchResponse, HttpFetcher, OfflineError, OfflineWorker, Request, RequestMode,
};
use geostamp_weather::{
    ConfiguredGeolocator, Position, SavedLocation, Session, Stamp, TracingStatus, WeatherError,
};
use reqwest::Method;

use crate::cli::{Cli, Command, ConfigCommand, OfflineCommand, PositionArgs};

/// Application state for one invocation.
pub struct App {
    config: Config,
}

impl App {
    /// Load and validate configuration from `path`, or the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        let (config, _) = config.into_validated()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn stamp(&self, position: PositionArgs) -> Result<Stamp> {
        let session = Session::from_config(&self.config)?;
        let geolocator = match position.coordinates() {
            Some((lat, lon)) => ConfiguredGeolocator::new(Some(Position::new(lat, lon))),
            None => ConfiguredGeolocator::from_config(&self.config.position),
        };
        let saved: Vec<SavedLocation> = self
            .config
            .locations
            .saved
            .iter()
            .map(SavedLocation::from)
            .collect();

        Ok(session.compose(&geolocator, &saved, &TracingStatus).await)
    }

    pub async fn copy(&self, position: PositionArgs, cancel: bool, dry_run: bool) -> Result<()> {
        if dry_run || self.config.clipboard.backend == ClipboardBackend::Memory {
            let clipboard = Arc::new(MemoryClipboard::new());
            self.copy_with(Arc::clone(&clipboard), position, cancel).await?;
            if let Some(text) = clipboard.contents() {
                println!("{}", text);
            }
            return Ok(());
        }

        self.copy_with(Arc::new(Osc52Clipboard::stdout()), position, cancel)
            .await
    }

    // The platform write is started before the stamp is composed.
    async fn copy_with<P: ClipboardPlatform>(
        &self,
        platform: Arc<P>,
        position: PositionArgs,
        cancel: bool,
    ) -> Result<()> {
        let transaction = ClipboardTransaction::begin(platform);

        if cancel {
            transaction.cancel().await?;
            eprintln!("Clipboard write canceled.");
            return Ok(());
        }

        let stamp = match self.stamp(position).await {
            Ok(stamp) => stamp,
            Err(e) => {
                transaction.cancel().await?;
                return Err(e);
            }
        };

        match transaction.write_text(&stamp.to_string())?.await {
            Ok(_) => {
                tracing::info!("Stamp copied to clipboard");
                Ok(())
            }
            Err(DeferredError::Rejected(message)) => Err(AppError::Clipboard(message).into()),
            Err(e) => Err(AppError::Clipboard(e.to_string()).into()),
        }
    }

    fn offline_worker(&self) -> Result<OfflineWorker<HttpFetcher>> {
        std::fs::create_dir_all(&self.config.config_dir)
            .context("Failed to create config directory")?;
        let storage = CacheStorage::new(self.config.offline_database_path())?;
        let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;
        Ok(OfflineWorker::new(&self.config.offline, storage, fetcher)?)
    }

    pub async fn offline(&self, action: OfflineCommand) -> Result<()> {
        let worker = self.offline_worker()?;

        match action {
            OfflineCommand::Install => {
                let count = worker.on_install().await?;
                println!("Installed {} ({} assets)", worker.cache_name(), count);
                report_deleted(&worker.on_activate().await?);
            }
            OfflineCommand::Activate => {
                if !worker.resume()? {
                    return Err(AppError::Offline(format!(
                        "{} is not installed; run `geostamp offline install`",
                        worker.cache_name()
                    ))
                    .into());
                }
                report_deleted(&worker.on_activate().await?);
                println!("Activated {}", worker.cache_name());
            }
            OfflineCommand::Fetch {
                url,
                navigate,
                method,
            } => {
                if worker.resume()? {
                    worker.on_activate().await?;
                }
                let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                    .with_context(|| format!("Invalid HTTP method: {}", method))?;
                let mode = if navigate {
                    RequestMode::Navigate
                } else {
                    RequestMode::Subresource
                };

                let (source, response) =
                    match worker.on_fetch(&Request::new(method, url, mode)).await {
                        FetchResponse::Passthrough => {
                            println!("passthrough (not handled by the offline cache)");
                            return Ok(());
                        }
                        FetchResponse::Failed(e) => return Err(e.into()),
                        FetchResponse::Cached(r) => ("cache", r),
                        FetchResponse::Network(r) => ("network", r),
                        FetchResponse::Fallback(r) => ("offline fallback", r),
                    };
                println!(
                    "{} {} {} ({} bytes)",
                    source,
                    response.status,
                    response.url,
                    response.body.len()
                );
            }
            OfflineCommand::Keys => {
                for (name, entries) in worker.stores()? {
                    let marker = if name == worker.cache_name() { "*" } else { " " };
                    println!("{} {} ({} entries)", marker, name, entries);
                }
            }
        }

        Ok(())
    }
}

fn report_deleted(deleted: &[String]) {
    for name in deleted {
        println!("Removed stale cache {}", name);
    }
}

/// Execute one parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return config_command(cli.config.as_deref(), action);
    }

    let app = App::load(cli.config.as_deref())?;
    tracing::debug!("Config directory: {}", app.config().config_dir.display());

    match cli.command {
        Command::Stamp(position) => {
            let stamp = app.stamp(position).await?;
            println!("{}", stamp);
        }
        Command::Copy {
            position,
            cancel,
            dry_run,
        } => app.copy(position, cancel, dry_run).await?,
        Command::Offline { action } => app.offline(action).await?,
        Command::Config { .. } => {}
    }

    Ok(())
}

/// Classify a command failure so the binary can show a short message.
///
/// Typed errors are recovered through any `context` added on the way up.
pub fn into_app_error(err: anyhow::Error) -> AppError {
    let err = match err.downcast::<AppError>() {
        Ok(e) => return e,
        Err(err) => err,
    };
    let err = match err.downcast::<OfflineError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<ClipboardError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<WeatherError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<ConfigError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<StorageError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    let err = match err.downcast::<NetworkError>() {
        Ok(e) => return e.into(),
        Err(err) => err,
    };
    match err.downcast::<std::io::Error>() {
        Ok(e) => e.into(),
        Err(err) => AppError::Other(err),
    }
}

// Config commands must work on configs that fail validation.
fn config_command(path: Option<&Path>, action: &ConfigCommand) -> Result<()> {
    let path = path.map_or_else(Config::config_path, Path::to_path_buf);

    match action {
        ConfigCommand::Path => println!("{}", path.display()),
        ConfigCommand::Show => {
            let config = Config::load_from(&path)?;
            let text = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            print!("{}", text);
        }
        ConfigCommand::Validate => {
            let result = Config::load_from(&path)?.validate();
            for warning in &result.warnings {
                println!("warning: {}", warning);
            }
            for error in &result.errors {
                println!("error: {}", error);
            }
            if !result.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "{} has {} error(s)",
                    path.display(),
                    result.errors.len()
                ))
                .into());
            }
            println!("{} is valid", path.display());
        }
    }

    Ok(())
}
