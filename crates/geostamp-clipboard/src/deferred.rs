//! Single-settlement values that are settled from outside.
//!
//! A [`DeferredValue`] is an ordinary future; the matching [`SettleHandle`]
//! resolves or rejects it exactly once. Later settlement attempts are ignored.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

/// Why a deferred value did not produce `T`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeferredError<E> {
    #[error("deferred value rejected: {0}")]
    Rejected(E),

    /// Every settle handle was dropped before settling.
    #[error("deferred value abandoned before settlement")]
    Abandoned,
}

type Outcome<T, E> = Result<T, E>;

/// Settlement capability for a [`DeferredValue`].
///
/// Cheap to clone; all clones share one slot, so only the first
/// `resolve`/`reject` across all of them takes effect.
pub struct SettleHandle<T, E> {
    slot: Arc<Mutex<Option<oneshot::Sender<Outcome<T, E>>>>>,
}

impl<T, E> Clone for SettleHandle<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T, E> std::fmt::Debug for SettleHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettleHandle")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<T, E> SettleHandle<T, E> {
    /// Settle with a value. Returns `true` if this call settled it.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settle with an error. Returns `true` if this call settled it.
    pub fn reject(&self, reason: E) -> bool {
        self.settle(Err(reason))
    }

    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }

    fn settle(&self, outcome: Outcome<T, E>) -> bool {
        let Some(sender) = self.slot.lock().take() else {
            return false;
        };
        // The awaiting side may already be gone; the value still counts as settled.
        let _ = sender.send(outcome);
        true
    }
}

/// The awaitable half of a deferred value.
#[derive(Debug)]
pub struct DeferredValue<T, E> {
    receiver: oneshot::Receiver<Outcome<T, E>>,
}

impl<T, E> Future for DeferredValue<T, E> {
    type Output = Result<T, DeferredError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(Ok(value))) => Poll::Ready(Ok(value)),
            Poll::Ready(Ok(Err(reason))) => Poll::Ready(Err(DeferredError::Rejected(reason))),
            Poll::Ready(Err(_)) => Poll::Ready(Err(DeferredError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// An unsettled value together with its settlement capability.
#[derive(Debug)]
pub struct Deferred<T, E> {
    pub handle: SettleHandle<T, E>,
    pub value: DeferredValue<T, E>,
}

impl<T, E> Deferred<T, E> {
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            handle: SettleHandle {
                slot: Arc::new(Mutex::new(Some(sender))),
            },
            value: DeferredValue { receiver },
        }
    }

    pub fn split(self) -> (SettleHandle<T, E>, DeferredValue<T, E>) {
        (self.handle, self.value)
    }
}

impl<T, E> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for `Deferred::new().split()`.
pub fn deferred<T, E>() -> (SettleHandle<T, E>, DeferredValue<T, E>) {
    Deferred::new().split()
}
