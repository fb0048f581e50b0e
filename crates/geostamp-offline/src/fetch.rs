//! Network access for the worker.

use std::future::Future;
use std::time::Duration;

use geostamp_core::{NetworkError, ReqwestErrorExt};
use reqwest::Client;
use tracing::instrument;

use crate::request::{CachedResponse, Request};

/// Performs requests on behalf of the worker.
///
/// Non-2xx answers are responses, not errors; only a request that gets no
/// answer at all fails.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, request: &Request)
        -> impl Future<Output = Result<CachedResponse, NetworkError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(url = %request.url), level = "debug")]
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, NetworkError> {
        let response = self
            .client
            .request(request.method.clone(), &request.url)
            .send()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(ReqwestErrorExt::into_network_error)?
            .to_vec();

        Ok(CachedResponse {
            url,
            status,
            headers,
            body,
        })
    }
}
