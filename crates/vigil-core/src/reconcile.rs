//! Merges polled snapshots and streamed deltas into one `LiveMetrics`.
//!
//! Two sources feed the dashboard. Snapshots from the REST poller are
//! authoritative for the counters. Stream `traffic_update` frames
//! arrive more often and carry partial fields. The reconciler owns the
//! current value and is the only thing that changes it.
//!
//! A snapshot whose `total_entries` is zero means the backend restarted or
//! was reset. The reconciler then zeroes the counters and the breakdown,
//! forgets any streamed threat level, and latches: stream deltas are
//! ignored until a non-zero snapshot arrives, so a late delta cannot
//! resurrect pre-reset numbers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use vigil_api::{NetworkMetricsUpdate, TrafficUpdate};

use crate::model::{LiveMetrics, NetworkMetrics, Snapshot, ThreatLevel, TrafficSample};

const MIN_LATENCY_MS: f64 = 10.0;
// Throughput floor used when deriving latency, so an idle backend yields a
// large but finite figure.
const MIN_ENTRIES_PER_SECOND: f64 = 0.1;

#[derive(Debug, Default)]
pub struct MetricsReconciler {
    current: Arc<LiveMetrics>,
    /// Level the stream last stated. Wins over the blocked-count fallback.
    stated_threat: Option<ThreatLevel>,
    reset_latched: bool,
    last_seq: Option<u64>,
}

impl MetricsReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Arc<LiveMetrics> {
        &self.current
    }

    /// `true` between a zero snapshot and the next non-zero one.
    pub fn is_reset_latched(&self) -> bool {
        self.reset_latched
    }

    /// Merge an authoritative snapshot. Returns the new value if anything
    /// changed.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> Option<Arc<LiveMetrics>> {
        if let Some(last) = self.last_seq {
            if snapshot.seq < last {
                debug!(seq = snapshot.seq, last, "discarding stale snapshot");
                return None;
            }
        }
        self.last_seq = Some(snapshot.seq);

        let next = if snapshot.is_reset() {
            if !self.reset_latched {
                debug!("backend counters reset, clearing live metrics");
            }
            self.reset_latched = true;
            self.stated_threat = None;
            self.reset_metrics(snapshot)
        } else {
            self.reset_latched = false;
            self.merge_snapshot(snapshot)
        };

        self.commit(next)
    }

    /// Merge a streamed partial update. Only the fields the frame carried
    /// are overwritten. Ignored while the reset latch is set.
    pub fn apply_traffic_update(&mut self, update: &TrafficUpdate) -> Option<Arc<LiveMetrics>> {
        if self.reset_latched {
            trace!("backend reset pending, ignoring traffic update");
            return None;
        }

        let mut next = LiveMetrics::clone(&self.current);

        if let Some(ref breakdown) = update.attack_breakdown {
            next.attack_breakdown = sanitize_breakdown(breakdown);
        }
        if let Some(ref metrics) = update.network_metrics {
            merge_network_metrics(&mut next.network_metrics, metrics);
        }
        if let Some(ref label) = update.threat_level {
            match label.trim().parse::<ThreatLevel>() {
                Ok(level) => {
                    self.stated_threat = Some(level);
                    next.threat_level = level;
                }
                Err(_) => debug!(label, "ignoring unknown threat level"),
            }
        }

        self.commit(next)
    }

    fn reset_metrics(&self, snapshot: &Snapshot) -> LiveMetrics {
        let blocked = snapshot.attacks_blocked_today.unwrap_or(0);
        LiveMetrics {
            total_connections: 0,
            suspicious_activities: 0,
            blocked_attacks: blocked,
            threat_level: ThreatLevel::from_blocked_attacks(blocked),
            network_metrics: NetworkMetrics::default(),
            // Keep the categories so the chart axes stay stable.
            attack_breakdown: self
                .current
                .attack_breakdown
                .keys()
                .map(|k| (k.clone(), 0))
                .collect(),
        }
    }

    fn merge_snapshot(&self, snapshot: &Snapshot) -> LiveMetrics {
        let eps = finite_or_zero(snapshot.entries_per_second).max(0.0);
        let error_rate = finite_or_zero(snapshot.error_rate).clamp(0.0, 1.0);

        // No status response means no blocked count for this snapshot.
        let blocked = snapshot.attacks_blocked_today.unwrap_or(0);

        LiveMetrics {
            total_connections: snapshot
                .total_connections_today
                .unwrap_or(snapshot.total_entries),
            suspicious_activities: floor_to_u64(as_f64(snapshot.total_entries) * error_rate),
            blocked_attacks: blocked,
            threat_level: self
                .stated_threat
                .unwrap_or_else(|| ThreatLevel::from_blocked_attacks(blocked)),
            network_metrics: NetworkMetrics {
                bandwidth_usage_pct: (eps * 5.0).min(100.0),
                packet_loss_pct: error_rate * 100.0,
                latency_ms: (1000.0 / eps.max(MIN_ENTRIES_PER_SECOND)).max(MIN_LATENCY_MS),
            },
            attack_breakdown: self.current.attack_breakdown.clone(),
        }
    }

    fn commit(&mut self, next: LiveMetrics) -> Option<Arc<LiveMetrics>> {
        if *self.current == next {
            return None;
        }
        self.current = Arc::new(next);
        Some(Arc::clone(&self.current))
    }
}

/// History-log entry for a traffic update, sanitized the same way the
/// reconciler would merge it.
pub fn traffic_sample(
    update: &TrafficUpdate,
    timestamp: Option<DateTime<Utc>>,
    received_at: DateTime<Utc>,
) -> TrafficSample {
    let mut merged = NetworkMetrics::default();
    let metrics = update.network_metrics.clone().unwrap_or_default();
    merge_network_metrics(&mut merged, &metrics);

    TrafficSample {
        received_at,
        timestamp,
        threat_level: update
            .threat_level
            .as_deref()
            .and_then(|l| l.trim().parse().ok()),
        bandwidth_usage_pct: metrics.bandwidth_usage.map(|_| merged.bandwidth_usage_pct),
        packet_loss_pct: metrics.packet_loss.map(|_| merged.packet_loss_pct),
        latency_ms: metrics.latency.map(|_| merged.latency_ms),
        attack_breakdown: update.attack_breakdown.as_ref().map(sanitize_breakdown),
    }
}

fn merge_network_metrics(target: &mut NetworkMetrics, update: &NetworkMetricsUpdate) {
    if let Some(v) = update.bandwidth_usage.filter(|v| v.is_finite()) {
        target.bandwidth_usage_pct = v.clamp(0.0, 100.0);
    }
    if let Some(v) = update.packet_loss.filter(|v| v.is_finite()) {
        target.packet_loss_pct = v.max(0.0);
    }
    if let Some(v) = update.latency.filter(|v| v.is_finite()) {
        target.latency_ms = v.max(0.0);
    }
}

/// Non-negative integer counts; NaN and negatives become zero.
fn sanitize_breakdown(raw: &BTreeMap<String, f64>) -> BTreeMap<String, u64> {
    raw.iter()
        .map(|(k, &v)| (k.clone(), floor_to_u64(finite_or_zero(v))))
        .collect()
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn floor_to_u64(v: f64) -> u64 {
    // Float-to-int `as` saturates: negatives land on 0.
    v.floor() as u64
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn as_f64(v: u64) -> f64 {
    v as f64
}
