//! The offline asset worker: precache on install, drop stale stores on
//! activate, and answer GET requests cache-first.
//!
//! Install and activate each run to completion before returning, so
//! activation can never overlap an unfinished precache.

use geostamp_core::OfflineConfig;
use parking_lot::Mutex;
use reqwest::Method;
use url::Url;

use crate::error::OfflineError;
use crate::fetch::Fetcher;
use crate::request::{CachedResponse, Request};
use crate::storage::CacheStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, not yet installed.
    Parsed,
    Installing,
    /// Precache committed; waiting was skipped so activation may follow at once.
    Installed,
    Activating,
    /// Controls its clients and answers fetches.
    Activated,
    /// Install failed; this worker will never activate.
    Redundant,
}

/// How the worker answered a request.
#[derive(Debug)]
pub enum FetchResponse {
    /// Not intercepted; the host handles the request itself.
    Passthrough,
    Cached(CachedResponse),
    Network(CachedResponse),
    /// Network failed on a navigation; the offline document was served.
    Fallback(CachedResponse),
    /// Intercepted but nothing could be served.
    Failed(OfflineError),
}

impl FetchResponse {
    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            Self::Cached(r) | Self::Network(r) | Self::Fallback(r) => Some(r),
            Self::Passthrough | Self::Failed(_) => None,
        }
    }
}

pub struct OfflineWorker<F> {
    cache_name: String,
    scope: Url,
    offline_url: Url,
    precache: Vec<Url>,
    storage: Mutex<CacheStorage>,
    fetcher: F,
    state: Mutex<WorkerState>,
}

fn resolve(scope: &Url, entry: &str) -> Result<Url, OfflineError> {
    scope.join(entry).map_err(|source| OfflineError::InvalidUrl {
        url: entry.to_string(),
        source,
    })
}

impl<F: Fetcher> OfflineWorker<F> {
    /// Build a worker for one cache version.
    ///
    /// Manifest entries and the offline document are resolved against the
    /// scope URL. Entries that resolve to the same URL are kept once.
    pub fn new(
        config: &OfflineConfig,
        storage: CacheStorage,
        fetcher: F,
    ) -> Result<Self, OfflineError> {
        let scope = Url::parse(&config.scope_url).map_err(|source| OfflineError::InvalidUrl {
            url: config.scope_url.clone(),
            source,
        })?;
        let offline_url = resolve(&scope, &config.offline_url)?;
        let mut precache: Vec<Url> = Vec::with_capacity(config.precache.len());
        for entry in &config.precache {
            let url = resolve(&scope, entry)?;
            if !precache.contains(&url) {
                precache.push(url);
            }
        }

        Ok(Self {
            cache_name: config.cache_name.clone(),
            scope,
            offline_url,
            precache,
            storage: Mutex::new(storage),
            fetcher,
            state: Mutex::new(WorkerState::Parsed),
        })
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Whether this worker currently answers fetches.
    pub fn is_controlling(&self) -> bool {
        self.state() == WorkerState::Activated
    }

    /// Distinct resolved manifest URLs, in manifest order.
    pub fn precache_urls(&self) -> &[Url] {
        &self.precache
    }

    /// Move to `next` if the current state is one of `from`, under one lock.
    fn transition(
        &self,
        action: &'static str,
        from: &[WorkerState],
        next: WorkerState,
    ) -> Result<(), OfflineError> {
        let mut state = self.state.lock();
        if !from.contains(&*state) {
            return Err(OfflineError::InvalidState {
                action,
                state: *state,
            });
        }
        tracing::debug!("Worker {}: {:?} -> {:?}", self.cache_name, *state, next);
        *state = next;
        Ok(())
    }

    fn set_state(&self, state: WorkerState) {
        let previous = std::mem::replace(&mut *self.state.lock(), state);
        tracing::debug!("Worker {}: {:?} -> {:?}", self.cache_name, previous, state);
    }

    /// Fetch every manifest entry and store them all, or nothing.
    ///
    /// Returns the number of entries stored.
    ///
    /// # Errors
    /// Any failed fetch or non-2xx response fails the install and leaves the
    /// worker `Redundant`.
    pub async fn on_install(&self) -> Result<usize, OfflineError> {
        self.transition(
            "install",
            &[WorkerState::Parsed, WorkerState::Redundant],
            WorkerState::Installing,
        )?;
        tracing::info!(
            "Installing offline cache {} ({} assets)",
            self.cache_name,
            self.precache.len()
        );

        match self.precache_all().await {
            Ok(count) => {
                // Skip waiting: the new version is ready to activate immediately.
                self.set_state(WorkerState::Installed);
                tracing::info!("Precached {} assets into {}", count, self.cache_name);
                Ok(count)
            }
            Err(e) => {
                tracing::error!("Install of {} failed: {}", self.cache_name, e);
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn precache_all(&self) -> Result<usize, OfflineError> {
        self.storage.lock().open(&self.cache_name)?;

        let mut responses = Vec::with_capacity(self.precache.len());
        for url in &self.precache {
            let key = url.to_string();
            let mut response = self
                .fetcher
                .fetch(&Request::get(key.clone()))
                .await
                .map_err(|source| OfflineError::Fetch {
                    url: key.clone(),
                    source,
                })?;

            if !response.is_ok() {
                return Err(OfflineError::BadStatus {
                    url: key,
                    status: response.status,
                });
            }
            response.url = key;
            responses.push(response);
        }

        self.storage.lock().put_all(&self.cache_name, &responses)?;
        Ok(responses.len())
    }

    /// Delete every store except the current one and take control of clients.
    ///
    /// Returns the names of the deleted stores.
    pub async fn on_activate(&self) -> Result<Vec<String>, OfflineError> {
        self.transition("activate", &[WorkerState::Installed], WorkerState::Activating)?;

        let deleted = match self.delete_stale_stores() {
            Ok(deleted) => deleted,
            Err(e) => {
                self.set_state(WorkerState::Installed);
                return Err(e);
            }
        };

        // Claim clients: from here on every fetch in scope goes through this worker.
        self.set_state(WorkerState::Activated);
        tracing::info!("Offline cache {} active", self.cache_name);
        Ok(deleted)
    }

    fn delete_stale_stores(&self) -> Result<Vec<String>, OfflineError> {
        let storage = self.storage.lock();
        let mut deleted = Vec::new();
        for name in storage.keys()? {
            if name != self.cache_name && storage.delete(&name)? {
                tracing::info!("Deleted stale offline cache {}", name);
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Pick up a complete install left by an earlier run of this version.
    ///
    /// Complete means the current store holds an entry for every manifest
    /// URL. Returns whether one was found; if so the worker is `Installed`
    /// and ready to activate without fetching anything.
    pub fn resume(&self) -> Result<bool, OfflineError> {
        let installed = {
            let storage = self.storage.lock();
            if storage.has(&self.cache_name)? {
                let mut complete = true;
                for url in &self.precache {
                    if storage.match_in(&self.cache_name, url.as_str())?.is_none() {
                        complete = false;
                        break;
                    }
                }
                complete
            } else {
                false
            }
        };
        if installed {
            // Only a fresh worker adopts the earlier install.
            let _ = self.transition("resume", &[WorkerState::Parsed], WorkerState::Installed);
        }
        Ok(installed)
    }

    /// Answer a request: cache first, then network, then (for navigations)
    /// the offline document.
    pub async fn on_fetch(&self, request: &Request) -> FetchResponse {
        if request.method != Method::GET || !self.is_controlling() {
            return FetchResponse::Passthrough;
        }

        let url = match resolve(&self.scope, &request.url) {
            Ok(url) => url.to_string(),
            Err(e) => return FetchResponse::Failed(e),
        };

        let cached = self.storage.lock().match_url(&url);
        match cached {
            Ok(Some(response)) => {
                tracing::debug!("Serving {} from cache", url);
                return FetchResponse::Cached(response);
            }
            Ok(None) => {}
            Err(e) => return FetchResponse::Failed(e.into()),
        }

        let network_request = Request::new(request.method.clone(), url.clone(), request.mode);
        let error = match self.fetcher.fetch(&network_request).await {
            Ok(response) => return FetchResponse::Network(response),
            Err(source) => OfflineError::Fetch { url, source },
        };

        if !request.is_navigation() {
            return FetchResponse::Failed(error);
        }

        tracing::warn!("Navigation failed, serving offline document: {}", error);
        let fallback = self.storage.lock().match_url(self.offline_url.as_str());
        match fallback {
            Ok(Some(response)) => FetchResponse::Fallback(response),
            Ok(None) => FetchResponse::Failed(error),
            Err(e) => FetchResponse::Failed(e.into()),
        }
    }

    /// Store names with their entry counts, oldest first.
    pub fn stores(&self) -> Result<Vec<(String, usize)>, OfflineError> {
        let storage = self.storage.lock();
        storage
            .keys()?
            .into_iter()
            .map(|name| {
                let count = storage.entry_count(&name)?;
                Ok((name, count))
            })
            .collect()
    }
}
