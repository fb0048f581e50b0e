//! Session cache behaviour against mock geocode and forecast servers.
//!
//! Each mock carries an `.expect(n)` so the server verifies, when dropped,
//! exactly how many network calls were made.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use geostamp_weather::{
    Clock, NominatimClient, OpenMeteoClient, Position, SavedLocation, Session, WEATHER_UNAVAILABLE,
};
use parking_lot::Mutex;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap(),
        )))
    }

    fn advance(&self, by: Duration) {
        *self.0.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

fn session(geo: &MockServer, weather: &MockServer) -> Session {
    Session::new(
        NominatimClient::new(&geo.uri(), "geostamp-tests/0.1").unwrap(),
        OpenMeteoClient::new(&weather.uri()).unwrap(),
    )
}

fn forecast_body() -> serde_json::Value {
    serde_json::json!({
        "latitude": 10.0,
        "longitude": 10.0,
        "current_weather": {
            "temperature": 21.4,
            "weathercode": 0,
            "windspeed": 9.7,
            "winddirection": 180
        }
    })
}

#[tokio::test]
async fn test_address_within_200m_is_not_refetched() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "display_name": "1 Main Street, Springfield"
        })))
        .expect(1)
        .mount(&geo)
        .await;

    let session = session(&geo, &weather);

    let first = session.get_address(10.0, 10.0).await;
    // ~199 m north
    let second = session.get_address(10.00179, 10.0).await;

    assert_eq!(first, "1 Main Street, Springfield");
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_address_beyond_200m_is_refetched() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "display_name": "First Place"
        })))
        .expect(1)
        .mount(&geo)
        .await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "10.00181"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "display_name": "Second Place"
        })))
        .expect(1)
        .mount(&geo)
        .await;

    let session = session(&geo, &weather);

    assert_eq!(session.get_address(10.0, 10.0).await, "First Place");
    // ~201 m north
    assert_eq!(session.get_address(10.00181, 10.0).await, "Second Place");
}

#[tokio::test]
async fn test_failed_lookup_caches_coordinate_fallback() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&geo)
        .await;

    let session = session(&geo, &weather);

    assert_eq!(session.get_address(10.0, 10.5).await, "(10, 10.5)");
    assert_eq!(session.get_address(10.0001, 10.5).await, "(10, 10.5)");
}

#[tokio::test]
async fn test_missing_display_name_falls_back() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "Unable to geocode"
        })))
        .expect(1)
        .mount(&geo)
        .await;

    let session = session(&geo, &weather);
    assert_eq!(session.get_address(-33.5, 151.25).await, "(-33.5, 151.25)");
}

#[tokio::test]
async fn test_weather_is_reused_within_the_hour() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("current_weather", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(1)
        .mount(&weather)
        .await;

    let clock = ManualClock::new();
    let session = session(&geo, &weather).with_clock(clock.clone());
    let pos = Position::new(10.0, 10.0);

    let first = session.get_weather(&pos).await;
    clock.advance(Duration::minutes(59));
    let second = session.get_weather(&pos).await;

    assert_eq!(first, "Weather: 21.4°C, Clear sky, wind 9.7 km/h");
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_weather_refreshes_once_after_expiry() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(2)
        .mount(&weather)
        .await;

    let clock = ManualClock::new();
    let session = session(&geo, &weather).with_clock(clock.clone());
    let pos = Position::new(10.0, 10.0);

    session.get_weather(&pos).await;
    clock.advance(Duration::hours(1));
    session.get_weather(&pos).await;
    session.get_weather(&pos).await;
}

#[tokio::test]
async fn test_weather_failure_is_cached() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&weather)
        .await;

    let clock = ManualClock::new();
    let session = session(&geo, &weather).with_clock(clock.clone());
    let pos = Position::new(10.0, 10.0);

    assert_eq!(session.get_weather(&pos).await, WEATHER_UNAVAILABLE);
    clock.advance(Duration::minutes(30));
    assert_eq!(session.get_weather(&pos).await, WEATHER_UNAVAILABLE);
}

#[tokio::test]
async fn test_forecast_without_current_weather_is_unavailable() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "latitude": 10.0
        })))
        .expect(1)
        .mount(&weather)
        .await;

    let session = session(&geo, &weather);
    assert_eq!(
        session.get_weather(&Position::new(10.0, 10.0)).await,
        WEATHER_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_saved_location_within_100m_skips_network() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&geo)
        .await;

    let session = session(&geo, &weather);
    let saved = vec![SavedLocation::new("Home", 10.0, 10.0)];
    let statuses = Mutex::new(Vec::<String>::new());
    let sink = |m: &str| statuses.lock().push(m.to_string());

    // ~50 m north
    let label = session
        .identify_position(&Position::new(10.00045, 10.0), &saved, &sink)
        .await;

    assert_eq!(label, "at Home");
    assert!(statuses.lock().is_empty());
}

#[tokio::test]
async fn test_saved_location_beyond_100m_reverse_geocodes() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "display_name": "Corner Shop"
        })))
        .expect(1)
        .mount(&geo)
        .await;

    let session = session(&geo, &weather);
    let saved = vec![SavedLocation::new("Home", 10.0, 10.0)];
    let statuses = Mutex::new(Vec::<String>::new());
    let sink = |m: &str| statuses.lock().push(m.to_string());

    // ~150 m north
    let label = session
        .identify_position(&Position::new(10.00135, 10.0), &saved, &sink)
        .await;

    assert_eq!(label, "at Corner Shop");
    assert_eq!(
        *statuses.lock(),
        vec!["No saved match. Looking up address...".to_string()]
    );
}

#[tokio::test]
async fn test_compose_builds_full_stamp() {
    let geo = MockServer::start().await;
    let weather = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(1)
        .mount(&weather)
        .await;

    let session = session(&geo, &weather);
    let saved = vec![SavedLocation::new("Home", 10.0, 10.0)];
    let geolocator = geostamp_weather::ConfiguredGeolocator::new(Some(Position::new(10.0, 10.0)));

    let stamp = session
        .compose(&geolocator, &saved, &geostamp_weather::TracingStatus)
        .await;

    assert_eq!(stamp.location, "at Home");
    assert_eq!(stamp.weather, "Weather: 21.4°C, Clear sky, wind 9.7 km/h");
    assert!(!stamp.timestamp.is_empty());
}
