use chrono::{DateTime, Utc};
use serde::Serialize;

use vigil_api::{LogStatistics, MonitoringStatistics};

/// One authoritative reading of backend counters, as assembled by the
/// snapshot poller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Issue order. A snapshot with a lower `seq` than one already applied
    /// is stale.
    pub seq: u64,
    pub total_entries: u64,
    pub entries_per_second: f64,
    pub error_rate: f64,
    pub unique_sources: u64,
    /// `None` when the status request failed or omitted the field.
    pub total_connections_today: Option<u64>,
    pub attacks_blocked_today: Option<u64>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn from_api(
        seq: u64,
        stats: &LogStatistics,
        monitoring: Option<&MonitoringStatistics>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            seq,
            total_entries: stats.total_entries,
            entries_per_second: stats.entries_per_second,
            error_rate: stats.error_rate,
            unique_sources: stats.unique_sources,
            total_connections_today: monitoring.and_then(|m| m.total_connections_today),
            attacks_blocked_today: monitoring.and_then(|m| m.attacks_blocked_today),
            fetched_at,
        }
    }

    /// A backend whose counters read zero has been reset (or just started).
    pub fn is_reset(&self) -> bool {
        self.total_entries == 0
    }
}
