//! Clipboard writes that can be fed or abandoned after they start.
//!
//! Platform clipboards commit to a write when it is requested but take the
//! payload lazily. [`ClipboardTransaction`] starts the platform write right
//! away with a deferred payload, then either supplies the text
//! ([`write_text`](ClipboardTransaction::write_text)) or rejects the payload
//! ([`cancel`](ClipboardTransaction::cancel)) so the platform write fails.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::deferred::{deferred, DeferredValue, SettleHandle};
use crate::error::ClipboardError;
use crate::platform::{Blob, ClipboardItem, ClipboardPlatform, TEXT_PLAIN};

/// Reason given to the platform when a transaction is cancelled.
pub const CANCEL_REASON: &str = "Clipboard write canceled.";

const PENDING: u8 = 0;
const WRITTEN: u8 = 1;
const CANCELLED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Pending,
    Written,
    Cancelled,
}

/// Platform confirmation for a write: `Ok(true)` once the clipboard holds
/// the text, or the platform's error message.
pub type WriteResult = DeferredValue<bool, String>;

pub struct ClipboardTransaction {
    state: AtomicU8,
    input: SettleHandle<Blob, String>,
    result: Mutex<Option<WriteResult>>,
}

impl ClipboardTransaction {
    /// Start a platform write whose payload is not known yet.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin<P: ClipboardPlatform>(platform: Arc<P>) -> Self {
        let (input, payload) = deferred::<Blob, String>();
        let (result_handle, result) = deferred::<bool, String>();

        tokio::spawn(async move {
            let items = vec![ClipboardItem::new(TEXT_PLAIN, payload)];
            match platform.write(items).await {
                Ok(()) => {
                    result_handle.resolve(true);
                }
                Err(e) => {
                    tracing::debug!("Platform clipboard write failed: {}", e);
                    result_handle.reject(e.to_string());
                }
            }
        });

        Self {
            state: AtomicU8::new(PENDING),
            input,
            result: Mutex::new(Some(result)),
        }
    }

    pub fn state(&self) -> TransactionState {
        match self.state.load(Ordering::Acquire) {
            WRITTEN => TransactionState::Written,
            CANCELLED => TransactionState::Cancelled,
            _ => TransactionState::Pending,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state() != TransactionState::Pending
    }

    /// Supply the text and hand back the platform confirmation.
    ///
    /// # Errors
    /// `ClipboardError::AlreadyCompleted` if the transaction was already
    /// written or cancelled.
    pub fn write_text(&self, text: &str) -> Result<WriteResult, ClipboardError> {
        self.complete(WRITTEN)?;
        self.input.resolve(Blob::text(text));
        self.take_result()
    }

    /// Abandon the write. Resolves once the platform has given up; the
    /// platform's failure is not reported.
    ///
    /// # Errors
    /// `ClipboardError::AlreadyCompleted` if the transaction was already
    /// written or cancelled.
    pub async fn cancel(&self) -> Result<(), ClipboardError> {
        self.complete(CANCELLED)?;
        self.input.reject(CANCEL_REASON.to_string());
        let result = self.take_result()?;
        if let Err(e) = result.await {
            tracing::debug!("Cancelled clipboard write ended with: {}", e);
        }
        Ok(())
    }

    fn complete(&self, next: u8) -> Result<(), ClipboardError> {
        self.state
            .compare_exchange(PENDING, next, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| ClipboardError::AlreadyCompleted)
    }

    // Only reachable once, by whichever call won `complete`.
    fn take_result(&self) -> Result<WriteResult, ClipboardError> {
        self.result
            .lock()
            .take()
            .ok_or(ClipboardError::AlreadyCompleted)
    }
}

impl std::fmt::Debug for ClipboardTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardTransaction")
            .field("state", &self.state())
            .finish()
    }
}
