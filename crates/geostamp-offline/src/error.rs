//! Offline cache error types.

use geostamp_core::{AppError, NetworkError, StorageError};
use thiserror::Error;

use crate::worker::WorkerState;

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: NetworkError,
    },

    #[error("Fetching {url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Worker cannot {action} while {state:?}")]
    InvalidState {
        action: &'static str,
        state: WorkerState,
    },
}

impl OfflineError {
    /// Whether the error came from the network rather than local state.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::BadStatus { .. })
    }
}

impl From<OfflineError> for AppError {
    fn from(err: OfflineError) -> Self {
        match err {
            OfflineError::Storage(e) => AppError::Storage(e),
            OfflineError::Fetch { source, .. } => AppError::Network(source),
            other => AppError::Offline(other.to_string()),
        }
    }
}
