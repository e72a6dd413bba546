#![allow(clippy::unwrap_used)]
// End-to-end tests for `LiveMonitor`: wiremock for the REST surface and a
// local tokio-tungstenite server for the live stream.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil_core::{
    ConnectionState, LiveMonitor, MonitorConfig, Notification, Subscription, ThreatLevel,
};

const WAIT: Duration = Duration::from_secs(5);

type ServerConn = WebSocketStream<TcpStream>;

// ── Helpers ─────────────────────────────────────────────────────────

/// Accept WebSocket upgrades and hand each connection to the test.
async fn stream_server() -> (Url, mpsc::UnboundedReceiver<ServerConn>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(tcp).await {
                if tx.send(ws).is_err() {
                    break;
                }
            }
        }
    });

    let url = Url::parse(&format!("ws://{addr}/api/v1/monitoring/live")).unwrap();
    (url, rx)
}

async fn rest_backend(total: u64, blocked: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_entries": total,
            "entries_per_second": 50.0,
            "error_rate": 0.02,
            "unique_sources": 4
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/monitoring/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "monitoring_status": {
                "statistics": { "attacks_blocked_today": blocked }
            }
        })))
        .mount(&server)
        .await;
    server
}

fn test_config(rest: &MockServer, stream_url: Url) -> MonitorConfig {
    MonitorConfig {
        stream_url: Some(stream_url),
        poll_interval: Duration::from_secs(3600),
        heartbeat_interval: Duration::from_millis(200),
        reconnect_delay: Duration::from_millis(100),
        connect_failure_backoff: Duration::from_millis(100),
        ..MonitorConfig::for_backend(Url::parse(&format!("{}/api/v1/", rest.uri())).unwrap())
    }
}

async fn wait_for<T, F>(sub: &mut Subscription<T>, pred: F) -> T
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T) -> bool,
{
    timeout(WAIT, async {
        loop {
            let value = sub.latest();
            if pred(&value) {
                return value;
            }
            sub.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}

async fn send_frame(conn: &mut ServerConn, frame: serde_json::Value) {
    conn.send(Message::text(frame.to_string())).await.unwrap();
}

fn attack(ip: &str, kind: &str) -> serde_json::Value {
    json!({
        "type": "attack_detected",
        "data": {
            "attack_type": kind,
            "source_ip": ip,
            "target_port": 80,
            "severity": "High",
            "confidence": 0.93,
            "details": format!("{kind} pattern from {ip}")
        },
        "timestamp": "2026-10-19T10:00:00.000123"
    })
}

/// Wait until the poller's first snapshot has been reconciled.
async fn wait_for_snapshot(monitor: &LiveMonitor) {
    timeout(WAIT, async {
        while monitor.store().last_snapshot_at().is_none() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_snapshot_and_stream_reconcile_into_live_metrics() {
    let rest = rest_backend(1000, 30).await;
    let (stream_url, mut conns) = stream_server().await;
    let monitor = LiveMonitor::new(test_config(&rest, stream_url)).unwrap();

    monitor.start().await.unwrap();
    let mut server = timeout(WAIT, conns.recv()).await.unwrap().unwrap();

    let mut state = monitor.connection_state();
    wait_for(&mut state, |s| *s == ConnectionState::Connected).await;

    let mut metrics = monitor.metrics();
    let m = wait_for(&mut metrics, |m| m.total_connections == 1000).await;
    assert_eq!(m.suspicious_activities, 20);
    assert_eq!(m.blocked_attacks, 30);
    assert_eq!(m.threat_level, ThreatLevel::Medium);

    send_frame(
        &mut server,
        json!({
            "type": "traffic_update",
            "data": {
                "current_threat_level": "High",
                "attack_breakdown": { "DoS": 5, "Probe": 2 },
                "network_metrics": { "bandwidth_usage": 64.5, "packet_loss": 0.3, "latency": 18.0 }
            },
            "timestamp": "2026-10-19T10:00:02"
        }),
    )
    .await;

    let m = wait_for(&mut metrics, |m| m.attack_breakdown.get("DoS") == Some(&5)).await;
    assert_eq!(m.threat_level, ThreatLevel::High);
    assert_eq!(m.network_metrics.bandwidth_usage_pct, 64.5);
    assert_eq!(m.total_connections, 1000);
    assert_eq!(monitor.traffic_log().latest().len(), 1);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_alerts_are_suppressed() {
    let rest = rest_backend(10, 0).await;
    let (stream_url, mut conns) = stream_server().await;
    let monitor = LiveMonitor::new(test_config(&rest, stream_url)).unwrap();
    let mut notifications = monitor.notifications();

    monitor.start().await.unwrap();
    let mut server = timeout(WAIT, conns.recv()).await.unwrap().unwrap();

    send_frame(&mut server, attack("10.0.0.5", "DoS")).await;
    send_frame(&mut server, attack("10.0.0.5", "DoS")).await;
    send_frame(&mut server, attack("10.0.0.9", "Probe")).await;

    let mut alerts = monitor.alerts();
    let list = wait_for(&mut alerts, |a| a.len() == 2).await;
    assert_eq!(list[0].source_ip, "10.0.0.9");
    assert_eq!(list[1].source_ip, "10.0.0.5");
    assert_eq!(list[1].message, "DoS pattern from 10.0.0.5");

    let mut alert_notices = 0;
    while let Ok(Ok(n)) = timeout(Duration::from_millis(200), notifications.recv()).await {
        if matches!(n, Notification::Alert(_)) {
            alert_notices += 1;
        }
    }
    assert_eq!(alert_notices, 2);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_heartbeat_pings_while_connected() {
    let rest = rest_backend(10, 0).await;
    let (stream_url, mut conns) = stream_server().await;
    let monitor = LiveMonitor::new(test_config(&rest, stream_url)).unwrap();

    monitor.start().await.unwrap();
    let mut server = timeout(WAIT, conns.recv()).await.unwrap().unwrap();

    let frame = timeout(WAIT, server.next()).await.unwrap().unwrap().unwrap();
    let text = frame.into_text().unwrap();
    let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(value, json!({ "type": "ping" }));

    // Pong is recorded.
    send_frame(&mut server, json!({ "type": "pong", "timestamp": "2026-10-19T10:00:00" })).await;
    timeout(WAIT, async {
        while monitor.store().last_pong_at().is_none() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_unexpected_close_reconnects_once() {
    let rest = rest_backend(10, 0).await;
    let (stream_url, mut conns) = stream_server().await;
    let monitor = LiveMonitor::new(test_config(&rest, stream_url)).unwrap();
    let mut notifications = monitor.notifications();

    monitor.start().await.unwrap();
    let mut first = timeout(WAIT, conns.recv()).await.unwrap().unwrap();
    let mut state = monitor.connection_state();
    wait_for(&mut state, |s| *s == ConnectionState::Connected).await;

    first.close(None).await.unwrap();

    let _second = timeout(WAIT, conns.recv()).await.unwrap().unwrap();
    wait_for(&mut state, |s| *s == ConnectionState::Connected).await;

    let mut scheduled = 0;
    let mut connected = 0;
    while let Ok(Ok(n)) = timeout(Duration::from_millis(200), notifications.recv()).await {
        match n {
            Notification::ReconnectScheduled { delay } => {
                assert_eq!(delay, Duration::from_millis(100));
                scheduled += 1;
            }
            Notification::Connected => connected += 1,
            _ => {}
        }
    }
    assert_eq!(scheduled, 1);
    assert_eq!(connected, 2);

    // Exactly one replacement connection.
    assert!(timeout(Duration::from_millis(400), conns.recv()).await.is_err());

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_stream_without_reconnect() {
    let rest = rest_backend(10, 0).await;
    let (stream_url, mut conns) = stream_server().await;
    let monitor = LiveMonitor::new(test_config(&rest, stream_url)).unwrap();

    monitor.start().await.unwrap();
    let mut server = timeout(WAIT, conns.recv()).await.unwrap().unwrap();
    let mut state = monitor.connection_state();
    wait_for(&mut state, |s| *s == ConnectionState::Connected).await;

    monitor.shutdown().await;

    let saw_close = timeout(WAIT, async {
        while let Some(Ok(msg)) = server.next().await {
            if msg.is_close() {
                return true;
            }
        }
        false
    })
    .await
    .unwrap();
    assert!(saw_close);
    assert_eq!(state.latest(), ConnectionState::Disconnected);

    assert!(timeout(Duration::from_millis(400), conns.recv()).await.is_err());
    assert!(monitor.start().await.is_err());
}

#[tokio::test]
async fn test_disconnect_stream_keeps_polling_and_can_reconnect() {
    let rest = rest_backend(10, 0).await;
    let (stream_url, mut conns) = stream_server().await;
    let monitor = LiveMonitor::new(test_config(&rest, stream_url)).unwrap();

    monitor.start().await.unwrap();
    let _first = timeout(WAIT, conns.recv()).await.unwrap().unwrap();
    let mut state = monitor.connection_state();
    wait_for(&mut state, |s| *s == ConnectionState::Connected).await;

    monitor.disconnect_stream().await.unwrap();
    wait_for(&mut state, |s| *s == ConnectionState::Disconnected).await;
    assert!(timeout(Duration::from_millis(400), conns.recv()).await.is_err());

    monitor.connect_stream().await.unwrap();
    let _second = timeout(WAIT, conns.recv()).await.unwrap().unwrap();
    wait_for(&mut state, |s| *s == ConnectionState::Connected).await;

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_zero_snapshot_then_duplicate_attack() {
    let rest = rest_backend(0, 0).await;
    let (stream_url, mut conns) = stream_server().await;
    let monitor = LiveMonitor::new(test_config(&rest, stream_url)).unwrap();

    monitor.start().await.unwrap();
    let mut server = timeout(WAIT, conns.recv()).await.unwrap().unwrap();
    wait_for_snapshot(&monitor).await;

    let dos = json!({
        "type": "attack_detected",
        "data": {
            "attack_type": "DoS",
            "source_ip": "10.0.0.1",
            "severity": "high",
            "confidence": 0.9
        }
    });
    send_frame(&mut server, dos.clone()).await;
    send_frame(&mut server, dos).await;
    // A later, distinct alert proves both DoS frames were processed.
    send_frame(&mut server, attack("10.0.0.2", "Probe")).await;

    let mut alerts = monitor.alerts();
    let list = wait_for(&mut alerts, |a| a.iter().any(|r| r.source_ip == "10.0.0.2")).await;
    let dos_alerts: Vec<_> = list.iter().filter(|r| r.source_ip == "10.0.0.1").collect();
    assert_eq!(dos_alerts.len(), 1);
    assert_eq!(dos_alerts[0].dedup_key, "10.0.0.1_DoS");

    let m = monitor.metrics_snapshot();
    assert_eq!(m.total_connections, 0);
    assert_eq!(m.suspicious_activities, 0);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_traffic_update_after_zero_snapshot_does_not_revive_counters() {
    let rest = rest_backend(0, 0).await;
    let (stream_url, mut conns) = stream_server().await;
    let monitor = LiveMonitor::new(test_config(&rest, stream_url)).unwrap();

    monitor.start().await.unwrap();
    let mut server = timeout(WAIT, conns.recv()).await.unwrap().unwrap();
    wait_for_snapshot(&monitor).await;

    send_frame(
        &mut server,
        json!({
            "type": "traffic_update",
            "data": {
                "current_threat_level": "High",
                "attack_breakdown": { "DoS": 12 },
                "network_metrics": { "bandwidth_usage": 80.0 }
            }
        }),
    )
    .await;

    // The raw sample is still logged.
    let mut log = monitor.traffic_log();
    wait_for(&mut log, |l| l.len() == 1).await;

    let m = monitor.metrics_snapshot();
    assert_eq!(m.total_connections, 0);
    assert_eq!(m.threat_level, ThreatLevel::Low);
    assert_eq!(m.attack_breakdown.get("DoS"), None);
    assert_eq!(m.network_metrics.bandwidth_usage_pct, 0.0);

    monitor.shutdown().await;
}
