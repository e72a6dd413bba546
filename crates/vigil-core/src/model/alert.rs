use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumString};
use uuid::Uuid;

use super::metrics::ThreatLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "PascalCase")]
#[strum(ascii_case_insensitive)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    /// Parse a backend severity label. Anything unrecognised is Medium,
    /// the backend's default for non-DoS detections.
    pub fn from_label(label: Option<&str>) -> Self {
        label
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(Self::Medium)
    }
}

/// An admitted intrusion alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub id: Uuid,
    /// `<source_ip>-<attack_type>`; two alerts with the same key inside the
    /// dedup window are the same alert.
    pub dedup_key: String,
    pub source_ip: String,
    pub attack_type: String,
    pub severity: AlertSeverity,
    /// 0.0..=1.0
    pub confidence: f64,
    pub target_port: Option<u16>,
    pub message: String,
    /// Server-supplied detection time. Display only.
    pub timestamp: Option<DateTime<Utc>>,
    /// Local receipt time; the dedup window is measured against this.
    pub received_at: DateTime<Utc>,
}

/// One entry of the raw traffic history log: the fields a `traffic_update`
/// actually carried, sanitized, with receipt time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSample {
    pub received_at: DateTime<Utc>,
    pub timestamp: Option<DateTime<Utc>>,
    pub threat_level: Option<ThreatLevel>,
    pub bandwidth_usage_pct: Option<f64>,
    pub packet_loss_pct: Option<f64>,
    pub latency_ms: Option<f64>,
    pub attack_breakdown: Option<BTreeMap<String, u64>>,
}
