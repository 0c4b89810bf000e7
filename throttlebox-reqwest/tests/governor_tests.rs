//! Integration tests for ReqwestTransport and the governor using wiremock.

use std::net::TcpListener;
use std::time::Duration;

use throttlebox::{FailureKind, Transport, TransportError};
use throttlebox_reqwest::{Governor, GovernorConfig, ReqwestTransport, global};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Short delays so retry tests run in wall-clock time.
fn fast_config() -> GovernorConfig {
    GovernorConfig::builder()
        .min_interval(Duration::from_millis(20))
        .retry_delay(Duration::from_millis(30))
        .build()
}

/// Test 1: Transport reports status and body as-is
#[tokio::test]
async fn test_transport_returns_status_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/anime/1"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"mal_id": 1}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let transport = ReqwestTransport::new();

    let ok = transport
        .get(&format!("{}/anime/1", mock_server.uri()))
        .await
        .unwrap();
    assert!(ok.is_success());
    let body: serde_json::Value = serde_json::from_slice(&ok.body).unwrap();
    assert_eq!(body["data"]["mal_id"], 1);

    let limited = transport
        .get(&format!("{}/limited", mock_server.uri()))
        .await
        .unwrap();
    assert!(limited.is_rate_limited());
}

/// Test 2: Refused connections surface as transport errors
#[tokio::test]
async fn test_transport_connection_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let error = ReqwestTransport::new()
        .get(&format!("http://127.0.0.1:{port}/anime/1"))
        .await
        .unwrap_err();

    assert!(matches!(error, TransportError::Connect(_)), "{error:?}");
}

/// Test 3: Second fetch is served from cache
#[tokio::test]
async fn test_governor_caches_responses() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/anime/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title": "Cowboy Bebop"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let governor = Governor::with_config(ReqwestTransport::new(), fast_config());
    let url = format!("{}/anime/1", mock_server.uri());

    let first = governor.fetch(url.as_str()).await.unwrap();
    let second = governor.fetch(url.as_str()).await.unwrap();

    assert_eq!(first["title"], "Cowboy Bebop");
    assert_eq!(first, second);
}

/// Test 4: 429 responses are retried until the upstream recovers
#[tokio::test]
async fn test_governor_retries_rate_limited() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/top/anime"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/top/anime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1, 2, 3])))
        .mount(&mock_server)
        .await;

    let governor = Governor::with_config(ReqwestTransport::new(), fast_config());

    let payload = governor
        .fetch(format!("{}/top/anime", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(payload.as_array().map(Vec::len), Some(3));
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

/// Test 5: Persistent server errors reject with the status in the message
#[tokio::test]
async fn test_governor_rejects_after_server_errors() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/anime/404"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&mock_server)
        .await;

    let governor = Governor::with_config(ReqwestTransport::new(), fast_config());

    let error = governor
        .fetch(format!("{}/anime/404", mock_server.uri()))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), FailureKind::RequestFailed);
    assert!(error.to_string().contains("404"));
}

/// Test 6: The shared instance is a single, default-configured governor
#[test]
fn test_global_instance() {
    assert!(std::ptr::eq(global(), global()));
    assert_eq!(global().config(), &GovernorConfig::default());
    assert_eq!(global().pending_len(), 0);
}
