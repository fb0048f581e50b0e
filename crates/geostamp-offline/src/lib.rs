//! Versioned offline asset cache for geostamp.
//!
//! An [`OfflineWorker`] precaches a fixed manifest into a named SQLite-backed
//! store, removes stores from earlier versions when it activates, and serves
//! GET requests cache-first with an offline document for failed navigations.

pub mod error;
pub mod fetch;
pub mod request;
pub mod storage;
pub mod worker;

pub use error::OfflineError;
pub use fetch::{Fetcher, HttpFetcher};
pub use request::{CachedResponse, Request, RequestMode};
pub use storage::CacheStorage;
pub use worker::{FetchResponse, OfflineWorker, WorkerState};
