//! Cancellable clipboard writes for geostamp.
//!
//! Provides a single-settlement [`Deferred`] value and the
//! [`ClipboardTransaction`] built on it, plus the clipboard platforms the
//! transaction can drive.

pub mod deferred;
pub mod error;
pub mod platform;
pub mod transaction;

pub use deferred::{deferred, Deferred, DeferredError, DeferredValue, SettleHandle};
pub use error::ClipboardError;
pub use platform::{Blob, ClipboardItem, ClipboardPlatform, MemoryClipboard, Osc52Clipboard};
pub use transaction::{ClipboardTransaction, TransactionState, WriteResult, CANCEL_REASON};
