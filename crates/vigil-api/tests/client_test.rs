#![allow(clippy::unwrap_used)]
// Integration tests for `NidsClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil_api::{AttackType, Error, NidsClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NidsClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api/v1", server.uri())).unwrap();
    let client = NidsClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_statistics_flat_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_entries": 1000,
            "entries_per_second": 50.0,
            "error_rate": 0.02,
            "unique_sources": 12
        })))
        .mount(&server)
        .await;

    let stats = client.statistics().await.unwrap();
    assert_eq!(stats.total_entries, 1000);
    assert!((stats.entries_per_second - 50.0).abs() < f64::EPSILON);
    assert!((stats.error_rate - 0.02).abs() < f64::EPSILON);
    assert_eq!(stats.unique_sources, 12);
}

#[tokio::test]
async fn test_statistics_wrapped_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "statistics": { "total_entries": 0, "entries_per_second": 0.0, "error_rate": 0.0, "unique_sources": 0 },
            "timestamp": "2026-10-19T10:00:00"
        })))
        .mount(&server)
        .await;

    let stats = client.statistics().await.unwrap();
    assert_eq!(stats.total_entries, 0);
}

#[tokio::test]
async fn test_monitoring_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/monitoring/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "monitoring_status": {
                "monitoring_active": true,
                "connected_clients": 1,
                "system_health": "Healthy",
                "uptime": "1h 5m",
                "statistics": {
                    "total_connections_today": 2500,
                    "attacks_blocked_today": 25,
                    "system_accuracy": 0.96
                }
            }
        })))
        .mount(&server)
        .await;

    let status = client.monitoring_status().await.unwrap();
    assert_eq!(status.system_health.as_deref(), Some("Healthy"));
    assert_eq!(status.statistics.total_connections_today, Some(2500));
    assert_eq!(status.statistics.attacks_blocked_today, Some(25));
}

#[tokio::test]
async fn test_simulate_attack_sends_query() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/monitoring/simulate-attack"))
        .and(query_param("attack_type", "U2R"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "U2R attack simulation completed",
            "simulation_data": {
                "attack_type": "U2R",
                "source_ip": "10.0.4.2",
                "packets": 512,
                "duration": 30,
                "severity": "High"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client.simulate_attack(AttackType::U2R).await.unwrap();
    assert_eq!(resp.status, "success");
    assert_eq!(resp.simulation_data.packets, 512);
    assert_eq!(resp.simulation_data.duration, 30);
}

#[tokio::test]
async fn test_health_hits_server_root() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "version": "1.0.0",
            "environment": "development"
        })))
        .mount(&server)
        .await;

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version.as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        bearer_token: Some("tok-123".to_string().into()),
        ..TransportConfig::default()
    };
    let base_url = Url::parse(&format!("{}/api/v1/", server.uri())).unwrap();
    let client = NidsClient::new(base_url, &transport).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/statistics"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total_entries": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.statistics().await.unwrap().total_entries, 3);
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_backend_error_uses_detail() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/monitoring/simulate-attack"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "detail": "Attack simulation failed"
        })))
        .mount(&server)
        .await;

    let err = client.simulate_attack(AttackType::DoS).await.unwrap_err();
    match err {
        Error::Backend { status, ref message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Attack simulation failed");
        }
        other => panic!("expected Backend error, got: {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_backend_error_plain_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/statistics"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let result = client.statistics().await;
    assert!(
        matches!(result, Err(Error::Backend { status: 502, ref message }) if message == "Bad Gateway"),
        "expected Backend 502, got: {result:?}"
    );
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.statistics().await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/monitoring/status"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not Found" })))
        .mount(&server)
        .await;

    let err = client.monitoring_status().await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_transient());
}
