//! Live monitoring stream frames.
//!
//! The backend pushes JSON text frames shaped as
//! `{ "type": "...", "data": {...}, "timestamp": "..." }`. [`decode_frame`]
//! turns one frame into a typed [`StreamFrame`]; anything that is not JSON or
//! carries an unknown `type` comes back as [`Error::InvalidFrame`] so the
//! caller can log and drop it without touching connection state.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Inbound ──────────────────────────────────────────────────────────

/// A decoded frame: the typed message plus the envelope timestamp.
///
/// The timestamp is server-supplied and unauthenticated; it is kept for
/// display only.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFrame {
    pub message: StreamMessage,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    TrafficUpdate(TrafficUpdate),
    /// `attack_detected`, and the backend's `simulated_attack` broadcast,
    /// which carries the same payload shape.
    AttackDetected(AttackReport),
    Ping,
    Pong,
    /// Batch analysis results. Not reconciled into live metrics.
    LogAnalysis(serde_json::Value),
}

impl StreamMessage {
    /// Wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TrafficUpdate(_) => "traffic_update",
            Self::AttackDetected(_) => "attack_detected",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::LogAnalysis(_) => "log_analysis",
        }
    }
}

/// Partial traffic update. Every field is optional: only what the backend
/// actually sent should overwrite reconciled state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficUpdate {
    /// Category → count. Kept as `f64` on the wire; sanitizing into
    /// non-negative integers is the reconciler's job.
    #[serde(default, alias = "attackBreakdown")]
    pub attack_breakdown: Option<BTreeMap<String, f64>>,
    #[serde(default, alias = "networkMetrics")]
    pub network_metrics: Option<NetworkMetricsUpdate>,
    #[serde(default, alias = "current_threat_level", alias = "threatLevel")]
    pub threat_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetricsUpdate {
    #[serde(default)]
    pub bandwidth_usage: Option<f64>,
    #[serde(default)]
    pub packet_loss: Option<f64>,
    #[serde(default)]
    pub latency: Option<f64>,
}

/// Payload of an `attack_detected` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackReport {
    #[serde(alias = "sourceIp")]
    pub source_ip: String,
    #[serde(alias = "attackType")]
    pub attack_type: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default, alias = "port")]
    pub target_port: Option<u16>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Decode one text frame.
pub fn decode_frame(text: &str) -> Result<StreamFrame, Error> {
    let raw: RawFrame = serde_json::from_str(text).map_err(|e| Error::InvalidFrame {
        message: e.to_string(),
    })?;

    let data = raw
        .data
        .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

    let message = match raw.kind.as_str() {
        "traffic_update" => StreamMessage::TrafficUpdate(payload(&raw.kind, data)?),
        "attack_detected" | "simulated_attack" => {
            StreamMessage::AttackDetected(payload(&raw.kind, data)?)
        }
        "ping" => StreamMessage::Ping,
        "pong" => StreamMessage::Pong,
        "log_analysis" => StreamMessage::LogAnalysis(data),
        other => {
            return Err(Error::InvalidFrame {
                message: format!("unknown message type '{other}'"),
            });
        }
    };

    Ok(StreamFrame {
        message,
        timestamp: raw.timestamp.as_deref().and_then(parse_timestamp),
    })
}

fn payload<T: serde::de::DeserializeOwned>(kind: &str, data: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(data).map_err(|e| Error::InvalidFrame {
        message: format!("malformed {kind} payload: {e}"),
    })
}

/// Parse an ISO-8601 timestamp. The backend emits naive local timestamps
/// (`2026-10-19T10:00:00.123456`); those are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// ── Outbound ─────────────────────────────────────────────────────────

/// Messages the client sends on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}

impl ClientMessage {
    pub fn to_frame(self) -> String {
        match self {
            Self::Ping => r#"{"type":"ping"}"#.to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_traffic_update_from_backend_shape() {
        let raw = serde_json::json!({
            "timestamp": "2026-10-19T10:00:00.250000",
            "type": "traffic_update",
            "data": {
                "total_connections": 1000,
                "current_threat_level": "Medium",
                "attack_breakdown": { "Normal": 980, "DoS": 10 },
                "network_metrics": { "bandwidth_usage": 42.5, "packet_loss": 2.0 }
            }
        });

        let frame = decode_frame(&raw.to_string()).unwrap();
        let StreamMessage::TrafficUpdate(update) = frame.message else {
            panic!("expected traffic_update");
        };

        assert_eq!(update.threat_level.as_deref(), Some("Medium"));
        assert_eq!(update.attack_breakdown.unwrap()["DoS"], 10.0);
        let metrics = update.network_metrics.unwrap();
        assert_eq!(metrics.bandwidth_usage, Some(42.5));
        assert_eq!(metrics.latency, None);
        assert_eq!(
            frame.timestamp.unwrap().to_rfc3339(),
            "2026-10-19T10:00:00.250+00:00"
        );
    }

    #[test]
    fn decode_attack_detected() {
        let raw = r#"{
            "type": "attack_detected",
            "data": {
                "attack_type": "DoS",
                "source_ip": "10.0.0.1",
                "target_port": 80,
                "severity": "High",
                "confidence": 0.9,
                "details": "High error rate detected from 10.0.0.1"
            }
        }"#;

        let frame = decode_frame(raw).unwrap();
        let StreamMessage::AttackDetected(report) = frame.message else {
            panic!("expected attack_detected");
        };
        assert_eq!(report.source_ip, "10.0.0.1");
        assert_eq!(report.attack_type, "DoS");
        assert_eq!(report.target_port, Some(80));
        assert!(frame.timestamp.is_none());
    }

    #[test]
    fn simulated_attack_decodes_as_attack() {
        let raw = r#"{"type":"simulated_attack","data":{"attack_type":"Probe","source_ip":"10.0.3.4","port":22,"severity":"High","confidence":0.95}}"#;
        let frame = decode_frame(raw).unwrap();
        assert_eq!(frame.message.kind(), "attack_detected");
    }

    #[test]
    fn ping_pong_without_data() {
        assert_eq!(decode_frame(r#"{"type":"pong"}"#).unwrap().message, StreamMessage::Pong);
        assert_eq!(decode_frame(r#"{"type":"ping"}"#).unwrap().message, StreamMessage::Ping);
    }

    #[test]
    fn unknown_type_is_invalid() {
        let err = decode_frame(r#"{"type":"model_trained","data":{}}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidFrame { .. }));
    }

    #[test]
    fn non_json_is_invalid() {
        assert!(matches!(
            decode_frame("not json at all"),
            Err(Error::InvalidFrame { .. })
        ));
    }

    #[test]
    fn attack_without_source_is_invalid() {
        let raw = r#"{"type":"attack_detected","data":{"attack_type":"DoS"}}"#;
        assert!(matches!(decode_frame(raw), Err(Error::InvalidFrame { .. })));
    }

    #[test]
    fn ping_frame_matches_wire_format() {
        let expected = serde_json::to_string(&ClientMessage::Ping).unwrap();
        assert_eq!(ClientMessage::Ping.to_frame(), expected);
    }

    #[test]
    fn rfc3339_timestamp_keeps_offset() {
        let ts = parse_timestamp("2026-10-19T12:00:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-10-19T10:00:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }
}
