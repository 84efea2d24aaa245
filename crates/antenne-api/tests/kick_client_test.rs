#![allow(clippy::unwrap_used)]
// Integration tests for `KickClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use antenne_api::{Error, KickClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(timeout: Duration) -> (MockServer, KickClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let transport = TransportConfig::default().with_timeout(timeout);
    let client = KickClient::new(base_url, &transport).unwrap();
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_channel_live() {
    let (server, client) = setup(Duration::from_secs(5)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/channels/triskel"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "slug": "triskel",
            "livestream": {
                "id": 99,
                "session_title": "radio libre",
                "is_live": true,
                "viewer_count": 321
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let channel = client.channel("triskel").await.unwrap();

    assert!(channel.is_live());
    assert_eq!(channel.slug.as_deref(), Some("triskel"));
    let stream = channel.livestream.unwrap();
    assert_eq!(stream.id, Some(99));
    assert_eq!(stream.viewer_count, Some(321));
}

#[tokio::test]
async fn test_channel_offline() {
    let (server, client) = setup(Duration::from_secs(5)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/channels/triskel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "slug": "triskel",
            "livestream": null
        })))
        .mount(&server)
        .await;

    let channel = client.channel("triskel").await.unwrap();
    assert!(!channel.is_live());
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let (server, client) = setup(Duration::from_secs(5)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/channels/triskel"))
        .and(header("user-agent", antenne_api::transport::DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client.channel("triskel").await.unwrap();
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_error_non_success_status() {
    let (server, client) = setup(Duration::from_secs(5)).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("blocked"))
        .mount(&server)
        .await;

    let result = client.channel("triskel").await;

    assert!(
        matches!(result, Err(Error::Status { status: 403 })),
        "expected Status error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_error_malformed_body() {
    let (server, client) = setup(Duration::from_secs(5)).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>cloudflare</html>"))
        .mount(&server)
        .await;

    let result = client.channel("triskel").await;

    match result {
        Err(Error::Deserialization { body, .. }) => {
            assert!(body.contains("cloudflare"));
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_timeout() {
    let (server, client) = setup(Duration::from_millis(200)).await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "livestream": { "is_live": true } }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let result = client.channel("triskel").await;

    assert!(
        result.as_ref().is_err_and(Error::is_timeout),
        "expected timeout, got: {result:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(3));
}
