//! Clipboard error types.

use geostamp_core::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    /// `write_text` or `cancel` was called on a transaction that already finished.
    #[error("Write operation already completed.")]
    AlreadyCompleted,

    /// The platform clipboard refused or failed the write.
    #[error("Clipboard write failed: {0}")]
    Platform(String),

    #[error("Clipboard IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ClipboardError> for AppError {
    fn from(err: ClipboardError) -> Self {
        AppError::Clipboard(err.to_string())
    }
}
