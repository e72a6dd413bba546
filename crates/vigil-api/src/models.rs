// REST wire types for the NIDS backend.
//
// These mirror the JSON bodies verbatim (snake_case). Endpoints have been
// observed both bare and wrapped in a `{ "status": "success", ... }`
// envelope, so each response has a tolerant envelope enum that unwraps to
// the payload.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

// ── Statistics ───────────────────────────────────────────────────────

/// Aggregate log-processing counters from the statistics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStatistics {
    #[serde(default)]
    pub total_entries: u64,
    #[serde(default)]
    pub entries_per_second: f64,
    #[serde(default)]
    pub error_rate: f64,
    #[serde(default)]
    pub unique_sources: u64,
    /// Start of the aggregation window (ISO-8601), if the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_start: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatisticsEnvelope {
    Wrapped { statistics: LogStatistics },
    Flat(LogStatistics),
}

impl StatisticsEnvelope {
    pub(crate) fn into_inner(self) -> LogStatistics {
        match self {
            Self::Wrapped { statistics } | Self::Flat(statistics) => statistics,
        }
    }
}

// ── Monitoring status ────────────────────────────────────────────────

/// Backend-side daily counters reported by `monitoring/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringStatistics {
    #[serde(default)]
    pub total_connections_today: Option<u64>,
    #[serde(default)]
    pub attacks_blocked_today: Option<u64>,
    #[serde(default)]
    pub false_positives: Option<u64>,
    #[serde(default)]
    pub system_accuracy: Option<f64>,
    #[serde(default)]
    pub unique_sources: Option<u64>,
    #[serde(default)]
    pub entries_per_second: Option<f64>,
    #[serde(default)]
    pub error_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringStatus {
    #[serde(default)]
    pub monitoring_active: Option<bool>,
    #[serde(default)]
    pub connected_clients: Option<u32>,
    #[serde(default)]
    pub system_health: Option<String>,
    #[serde(default)]
    pub uptime: Option<String>,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub statistics: MonitoringStatistics,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatusEnvelope {
    Wrapped { monitoring_status: MonitoringStatus },
    Flat(MonitoringStatus),
}

impl StatusEnvelope {
    pub(crate) fn into_inner(self) -> MonitoringStatus {
        match self {
            Self::Wrapped { monitoring_status } | Self::Flat(monitoring_status) => {
                monitoring_status
            }
        }
    }
}

// ── Attack simulation ────────────────────────────────────────────────

/// Attack categories the backend's simulation endpoint accepts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum AttackType {
    DoS,
    Probe,
    U2R,
    R2L,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationData {
    #[serde(default)]
    pub attack_type: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub target_ip: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub packets: u64,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub simulation_data: SimulationData,
}

// ── Health ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
}

/// FastAPI's error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}
