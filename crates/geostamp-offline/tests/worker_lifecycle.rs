//! Install / activate / fetch lifecycle of the offline worker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use geostamp_core::{NetworkError, OfflineConfig};
use geostamp_offline::{
    CacheStorage, CachedResponse, FetchResponse, Fetcher, HttpFetcher, OfflineError,
    OfflineWorker, Request, RequestMode, WorkerState,
};
use reqwest::Method;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCOPE: &str = "http://app.test/";

/// A network that serves fixed pages until it is switched off.
struct ScriptedNetwork {
    online: AtomicBool,
    pages: HashMap<String, (u16, String)>,
    requests: AtomicUsize,
}

impl ScriptedNetwork {
    fn new(pages: &[(&str, u16, &str)]) -> Self {
        Self {
            online: AtomicBool::new(true),
            pages: pages
                .iter()
                .map(|(p, status, body)| (format!("{SCOPE}{p}"), (*status, body.to_string())))
                .collect(),
            requests: AtomicUsize::new(0),
        }
    }

    fn go_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Fetcher for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, NetworkError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(NetworkError::ConnectionFailed("network unreachable".into()));
        }
        let (status, body) = self
            .pages
            .get(&request.url)
            .cloned()
            .unwrap_or((404, "not found".to_string()));
        Ok(CachedResponse {
            url: request.url.clone(),
            status,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: body.into_bytes(),
        })
    }
}

fn app_pages() -> ScriptedNetwork {
    ScriptedNetwork::new(&[
        ("index.html", 200, "<html>offline shell</html>"),
        ("index.js", 200, "console.log('stamp')"),
        ("manifest.json", 200, "{}"),
        ("icon-256.png", 200, "PNG"),
        ("live.json", 200, "{\"live\":true}"),
    ])
}

fn config(cache_name: &str) -> OfflineConfig {
    OfflineConfig {
        cache_name: cache_name.to_string(),
        scope_url: SCOPE.to_string(),
        offline_url: "index.html".to_string(),
        precache: vec![
            "./index.html".to_string(),
            "./index.js".to_string(),
            "./manifest.json".to_string(),
            "./icon-256.png".to_string(),
        ],
        database_file: "offline-cache.sqlite3".to_string(),
    }
}

async fn activated(network: ScriptedNetwork) -> OfflineWorker<ScriptedNetwork> {
    let worker =
        OfflineWorker::new(&config("v1"), CacheStorage::in_memory().unwrap(), network).unwrap();
    assert_eq!(worker.on_install().await.unwrap(), 4);
    worker.on_activate().await.unwrap();
    worker
}

#[tokio::test]
async fn test_activate_keeps_only_current_store() {
    let mut storage = CacheStorage::in_memory().unwrap();
    storage
        .put(
            "geo-timestamp-cache-v0",
            &CachedResponse {
                url: format!("{SCOPE}index.html"),
                status: 200,
                headers: vec![],
                body: b"stale".to_vec(),
            },
        )
        .unwrap();
    storage.open("unrelated").unwrap();

    let worker = OfflineWorker::new(&config("v1"), storage, app_pages()).unwrap();
    worker.on_install().await.unwrap();
    assert_eq!(worker.state(), WorkerState::Installed);

    let mut deleted = worker.on_activate().await.unwrap();
    deleted.sort();

    assert_eq!(deleted, vec!["geo-timestamp-cache-v0", "unrelated"]);
    assert_eq!(worker.stores().unwrap(), vec![("v1".to_string(), 4)]);
    assert!(worker.is_controlling());

    // The stale copy of index.html is gone; the fresh one is served.
    let answer = worker.on_fetch(&Request::get(format!("{SCOPE}index.html"))).await;
    assert_eq!(
        answer.response().map(|r| r.body.clone()),
        Some(b"<html>offline shell</html>".to_vec())
    );
}

#[tokio::test]
async fn test_precached_asset_served_offline() {
    let worker = activated(app_pages()).await;
    worker_network(&worker).go_offline();

    let answer = worker.on_fetch(&Request::get(format!("{SCOPE}index.js"))).await;

    match answer {
        FetchResponse::Cached(response) => assert_eq!(response.body, b"console.log('stamp')"),
        other => panic!("expected cached response, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cache_hit_skips_network() {
    let worker = activated(app_pages()).await;
    let before = worker_network(&worker).request_count();

    let answer = worker.on_fetch(&Request::get(format!("{SCOPE}manifest.json"))).await;

    assert!(matches!(answer, FetchResponse::Cached(_)));
    assert_eq!(worker_network(&worker).request_count(), before);
}

#[tokio::test]
async fn test_uncached_request_goes_to_network() {
    let worker = activated(app_pages()).await;

    let answer = worker.on_fetch(&Request::get(format!("{SCOPE}live.json"))).await;
    assert!(matches!(answer, FetchResponse::Network(_)));

    // Network responses are not added to the store.
    let again = worker.on_fetch(&Request::get(format!("{SCOPE}live.json"))).await;
    assert!(matches!(again, FetchResponse::Network(_)));
    assert_eq!(worker.stores().unwrap(), vec![("v1".to_string(), 4)]);
}

#[tokio::test]
async fn test_failed_navigation_falls_back_to_offline_document() {
    let worker = activated(app_pages()).await;
    worker_network(&worker).go_offline();

    let answer = worker
        .on_fetch(&Request::navigate(format!("{SCOPE}some/deep/page")))
        .await;

    match answer {
        FetchResponse::Fallback(response) => {
            assert_eq!(response.url, format!("{SCOPE}index.html"));
            assert_eq!(response.body, b"<html>offline shell</html>");
        }
        other => panic!("expected fallback, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_subresource_has_no_fallback() {
    let worker = activated(app_pages()).await;
    worker_network(&worker).go_offline();

    let answer = worker.on_fetch(&Request::get(format!("{SCOPE}live.json"))).await;

    match answer {
        FetchResponse::Failed(err) => assert!(err.is_network()),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_precache_commits_nothing() {
    let network = ScriptedNetwork::new(&[
        ("index.html", 200, "<html></html>"),
        ("index.js", 200, "js"),
        ("manifest.json", 500, "oops"),
        ("icon-256.png", 200, "PNG"),
    ]);
    let worker =
        OfflineWorker::new(&config("v1"), CacheStorage::in_memory().unwrap(), network).unwrap();

    let err = worker.on_install().await.unwrap_err();

    assert!(matches!(err, OfflineError::BadStatus { status: 500, .. }));
    assert_eq!(worker.state(), WorkerState::Redundant);
    assert_eq!(worker.stores().unwrap(), vec![("v1".to_string(), 0)]);
    assert!(worker.on_activate().await.is_err());
}

#[tokio::test]
async fn test_non_get_passes_through() {
    let worker = activated(app_pages()).await;
    let before = worker_network(&worker).request_count();

    let post = Request::new(Method::POST, format!("{SCOPE}index.html"), RequestMode::Subresource);
    let answer = worker.on_fetch(&post).await;

    assert!(matches!(answer, FetchResponse::Passthrough));
    assert_eq!(worker_network(&worker).request_count(), before);
}

#[tokio::test]
async fn test_install_over_http() {
    let server = MockServer::start().await;
    for (asset, body) in [("/index.html", "<html></html>"), ("/index.js", "js")] {
        Mock::given(method("GET"))
            .and(path(asset))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = OfflineConfig {
        scope_url: format!("{}/", server.uri()),
        precache: vec!["./index.html".to_string(), "./index.js".to_string()],
        ..config("http-v1")
    };
    let dir = tempfile::tempdir().unwrap();
    let storage = CacheStorage::new(dir.path().join("offline.sqlite3")).unwrap();
    let worker = OfflineWorker::new(&config, storage, HttpFetcher::new().unwrap()).unwrap();

    assert_eq!(worker.on_install().await.unwrap(), 2);
    worker.on_activate().await.unwrap();

    let answer = worker
        .on_fetch(&Request::get(format!("{}/index.js", server.uri())))
        .await;
    assert!(matches!(answer, FetchResponse::Cached(_)));
}

#[tokio::test]
async fn test_new_version_replaces_old_on_activate() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("offline.sqlite3");

    let v1 = OfflineWorker::new(&config("v1"), CacheStorage::new(&db).unwrap(), app_pages())
        .unwrap();
    v1.on_install().await.unwrap();
    v1.on_activate().await.unwrap();
    drop(v1);

    let v2 = OfflineWorker::new(&config("v2"), CacheStorage::new(&db).unwrap(), app_pages())
        .unwrap();
    assert!(!v2.resume().unwrap());
    v2.on_install().await.unwrap();
    assert_eq!(v2.on_activate().await.unwrap(), vec!["v1"]);
    assert_eq!(v2.stores().unwrap(), vec![("v2".to_string(), 4)]);
}

fn worker_network(worker: &OfflineWorker<ScriptedNetwork>) -> &ScriptedNetwork {
    worker.fetcher()
}
