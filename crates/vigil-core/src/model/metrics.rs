use std::collections::BTreeMap;

use serde::Serialize;
use strum::{Display, EnumString};

/// Overall threat assessment shown on the dashboard.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumString,
)]
#[serde(rename_all = "PascalCase")]
#[strum(ascii_case_insensitive)]
pub enum ThreatLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    /// Level derived from blocked-attack volume when the backend has not
    /// stated one: more than 50 is High, more than 20 is Medium.
    pub fn from_blocked_attacks(blocked: u64) -> Self {
        if blocked > 50 {
            Self::High
        } else if blocked > 20 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Derived link health figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetworkMetrics {
    /// Percent, 0..=100.
    pub bandwidth_usage_pct: f64,
    /// Percent, >= 0.
    pub packet_loss_pct: f64,
    pub latency_ms: f64,
}

/// The single reconciled view of live telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveMetrics {
    pub total_connections: u64,
    pub suspicious_activities: u64,
    pub blocked_attacks: u64,
    pub threat_level: ThreatLevel,
    pub network_metrics: NetworkMetrics,
    /// Attack category -> count.
    pub attack_breakdown: BTreeMap<String, u64>,
}

impl LiveMetrics {
    /// `true` when nothing has been observed yet (or after a backend reset).
    pub fn is_empty(&self) -> bool {
        self.total_connections == 0
            && self.suspicious_activities == 0
            && self.attack_breakdown.values().all(|&v| v == 0)
    }
}
