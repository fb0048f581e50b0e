//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "geostamp",
    version,
    about = "Timestamp, place and weather in one line of text"
)]
pub struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a stamp for the current position.
    Stamp(PositionArgs),

    /// Compose a stamp and write it to the clipboard.
    Copy {
        #[command(flatten)]
        position: PositionArgs,

        /// Abandon the write instead of supplying the stamp.
        #[arg(long)]
        cancel: bool,

        /// Use an in-process clipboard and print what would be copied.
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage the offline asset cache.
    Offline {
        #[command(subcommand)]
        action: OfflineCommand,
    },

    /// Inspect the configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

/// Overrides for the configured position.
#[derive(Debug, Clone, Copy, Args)]
pub struct PositionArgs {
    /// Latitude in degrees.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude in degrees.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl PositionArgs {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}

#[derive(Debug, Subcommand)]
pub enum OfflineCommand {
    /// Precache the manifest and activate the new version.
    Install,

    /// Activate an install left by an earlier run, removing stale stores.
    Activate,

    /// Answer a request the way the active worker would.
    Fetch {
        /// Absolute URL, or a path relative to the scope URL.
        url: String,

        /// Treat the request as a page navigation.
        #[arg(long)]
        navigate: bool,

        /// HTTP method.
        #[arg(long, default_value = "GET")]
        method: String,
    },

    /// List cache stores and their entry counts.
    Keys,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location.
    Path,
    /// Print the effective configuration as TOML.
    Show,
    /// Report validation errors and warnings.
    Validate,
}
