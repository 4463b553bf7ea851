use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tado_bridge::{
    Error, ErrorKind, Event, FeatureConfig, FileStorage, HttpTransport, MemoryStorage, Platform, ResponseLogMode,
    Storage, TemperatureUnit, Transport, SESSION_KEY, SHORT_BACKOFF,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> FeatureConfig {
    let mut config = FeatureConfig::new("me@example.com", "p&ss word");
    config.base_url = format!("{}/api/v2", server.uri());
    config
}

async fn mount_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v2/me"))
        .and(query_param("username", "me@example.com"))
        .and(query_param("password", "p&ss word"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"homes": [{"id": 42}]})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/homes/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"temperatureUnit": "CELSIUS"})))
        .expect(1)
        .mount(server)
        .await;
}

fn zones_body() -> serde_json::Value {
    json!([{
        "id": 1,
        "name": "Living",
        "type": "HEATING",
        "devices": [
            {"deviceType": "VA01", "serialNo": "VA0000000001", "shortSerialNo": "VA01-1", "batteryState": "NORMAL"},
            {"deviceType": "VA01", "serialNo": "VA0000000002", "shortSerialNo": "VA01-2", "batteryState": "LOW"}
        ],
        "openWindowDetection": {"supported": true, "enabled": true}
    }])
}

#[tokio::test]
async fn bootstrap_then_zones_poll() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/homes/42/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(zones_body()))
        .mount(&server)
        .await;

    let events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(vec![]));
    let events_clone = events.clone();
    let mut platform = Platform::builder(config(&server))
        .on_event(move |event| events_clone.lock().unwrap().push(event.clone()))
        .build()
        .expect("build should succeed");

    let session = platform.ensure_session().await.expect("session");
    assert_eq!(session.home_id, 42);
    assert_eq!(session.temperature_unit, TemperatureUnit::Celsius);

    assert_eq!(platform.poll_zones().await, Duration::from_secs(10));
    let low = platform.registry().get("Living VA01-2").expect("second radiator");
    assert_eq!(low.context.battery_level, Some(10));
    assert_eq!(low.context.zone_id, Some(1));

    let captured = events.lock().unwrap();
    assert!(matches!(captured[0], Event::SessionReady(_)));
    assert_eq!(captured.len(), 3);
}

#[tokio::test]
async fn session_is_persisted_and_reused() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let mut first = Platform::builder(config(&server))
        .storage(FileStorage::new(dir.path()))
        .build()
        .unwrap();
    first.ensure_session().await.unwrap();

    let stored = FileStorage::new(dir.path()).get(SESSION_KEY).unwrap();
    assert_eq!(stored, Some(json!({"homeID": 42, "tempUnit": "CELSIUS"})));

    // a second start must not hit /me again; the mocks expect exactly one call
    let mut second = Platform::builder(config(&server))
        .storage(FileStorage::new(dir.path()))
        .build()
        .unwrap();
    assert_eq!(second.ensure_session().await.unwrap().home_id, 42);
}

#[tokio::test]
async fn server_error_backs_off_without_removals() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/homes/42/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(zones_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/homes/42/zones"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut storage = MemoryStorage::new();
    storage
        .set(SESSION_KEY, json!({"homeID": 42, "tempUnit": "CELSIUS"}))
        .unwrap();
    let mut platform = Platform::builder(config(&server)).storage(storage).build().unwrap();

    platform.poll_zones().await;
    assert_eq!(platform.registry().len(), 2);

    assert_eq!(platform.poll_zones().await, SHORT_BACKOFF);
    assert_eq!(platform.registry().len(), 2);
    assert_eq!(platform.zones_loop().errors(), 1);
}

#[tokio::test]
async fn http_transport_categorizes_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let transport = HttpTransport::new();
    let err = transport.get(&format!("{}/down", server.uri())).await.unwrap_err();
    assert!(matches!(err, Error::Status(503)), "got {err:?}");

    // nothing listens on port 9 locally
    let err = transport.get("http://127.0.0.1:9/").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamUnreachable, "got {err:?}");

    let err = transport.get("not a url").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestSetup, "got {err:?}");
}

#[tokio::test]
async fn response_log_records_each_fetch() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/homes/42/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(zones_body()))
        .mount(&server)
        .await;

    let log = tempfile::NamedTempFile::new().unwrap();
    let mut platform = Platform::builder(config(&server))
        .response_log(ResponseLogMode::Diffed, log.path())
        .build()
        .unwrap();
    platform.poll_zones().await;
    platform.poll_zones().await;

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(log.path())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let endpoints: Vec<_> = lines.iter().map(|l| l["endpoint"].as_str().unwrap()).collect();
    assert_eq!(endpoints, ["me", "home", "zones", "zones"]);
    assert_eq!(lines[0]["body"]["homes"][0]["id"], 42);
    assert_eq!(lines[1]["body"]["temperatureUnit"], "CELSIUS");
    assert_eq!(lines[2]["full"], true);
    assert_eq!(lines[3]["changes"].as_array().unwrap().len(), 0);
}

