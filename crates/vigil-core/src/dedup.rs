//! Alert admission with time-windowed duplicate suppression.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};
use uuid::Uuid;

use vigil_api::AttackReport;
use vigil_api::stream::parse_timestamp;

use crate::buffer::AlertBuffer;
use crate::model::{AlertRecord, AlertSeverity};

/// Decides whether an incoming attack report is a new alert.
///
/// Two reports with the same source IP and attack type are the same alert
/// if the earlier one was *received* less than `window` ago. The window is
/// measured on the local clock because server timestamps are naive and
/// unauthenticated.
#[derive(Debug, Clone, Copy)]
pub struct EventDeduplicator {
    window: Duration,
}

impl EventDeduplicator {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn key(source_ip: &str, attack_type: &str) -> String {
        format!("{source_ip}_{attack_type}")
    }

    /// `true` if `buffer` already holds an alert for `key` received within
    /// the window before `now`.
    pub fn is_duplicate(&self, key: &str, buffer: &AlertBuffer<AlertRecord>, now: DateTime<Utc>) -> bool {
        buffer.iter().any(|existing| {
            existing.dedup_key == key
                && match (now - existing.received_at).to_std() {
                    Ok(age) => age < self.window,
                    // Received "in the future": the clock stepped back. Treat as fresh.
                    Err(_) => true,
                }
        })
    }

    /// Admit `report` into `buffer` unless it duplicates a recent alert.
    /// Returns the stored record when admitted.
    pub fn admit(
        &self,
        report: &AttackReport,
        frame_timestamp: Option<DateTime<Utc>>,
        buffer: &mut AlertBuffer<AlertRecord>,
        now: DateTime<Utc>,
    ) -> Option<Arc<AlertRecord>> {
        let key = Self::key(&report.source_ip, &report.attack_type);
        if self.is_duplicate(&key, buffer, now) {
            debug!(key, "suppressing duplicate alert");
            return None;
        }

        let record = Arc::new(build_record(report, key, frame_timestamp, now));
        if let Some(evicted) = buffer.push_arc(Arc::clone(&record)) {
            trace!(evicted = %evicted.id, "alert buffer full, dropped oldest");
        }
        Some(record)
    }
}

impl Default for EventDeduplicator {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

fn build_record(
    report: &AttackReport,
    dedup_key: String,
    frame_timestamp: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AlertRecord {
    let confidence = report
        .confidence
        .filter(|c| c.is_finite())
        .map_or(0.0, |c| c.clamp(0.0, 1.0));

    let message = match report.details.as_deref().map(str::trim) {
        Some(details) if !details.is_empty() => details.to_owned(),
        _ => format!("{} attack detected from {}", report.attack_type, report.source_ip),
    };

    AlertRecord {
        id: Uuid::new_v4(),
        dedup_key,
        source_ip: report.source_ip.clone(),
        attack_type: report.attack_type.clone(),
        severity: AlertSeverity::from_label(report.severity.as_deref()),
        confidence,
        target_port: report.target_port,
        message,
        timestamp: report
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .or(frame_timestamp),
        received_at: now,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn report(ip: &str, kind: &str) -> AttackReport {
        AttackReport {
            source_ip: ip.into(),
            attack_type: kind.into(),
            severity: Some("High".into()),
            confidence: Some(0.92),
            details: None,
            target_port: Some(80),
            timestamp: None,
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-19T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn same_key_inside_window_is_suppressed() {
        let dedup = EventDeduplicator::default();
        let mut buf = AlertBuffer::new(10);
        let r = report("10.0.0.5", "DoS");

        assert!(dedup.admit(&r, None, &mut buf, t0()).is_some());
        assert!(dedup.admit(&r, None, &mut buf, t0() + TimeDelta::seconds(10)).is_none());
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn same_key_after_window_is_admitted() {
        let dedup = EventDeduplicator::default();
        let mut buf = AlertBuffer::new(10);
        let r = report("10.0.0.5", "DoS");

        dedup.admit(&r, None, &mut buf, t0());
        assert!(dedup.admit(&r, None, &mut buf, t0() + TimeDelta::seconds(61)).is_some());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let dedup = EventDeduplicator::default();
        let mut buf = AlertBuffer::new(10);
        let r = report("10.0.0.5", "DoS");

        dedup.admit(&r, None, &mut buf, t0());
        assert!(dedup.admit(&r, None, &mut buf, t0() + TimeDelta::seconds(60)).is_some());
    }

    #[test]
    fn different_type_or_source_is_distinct() {
        let dedup = EventDeduplicator::default();
        let mut buf = AlertBuffer::new(10);

        assert!(dedup.admit(&report("10.0.0.5", "DoS"), None, &mut buf, t0()).is_some());
        assert!(dedup.admit(&report("10.0.0.5", "Probe"), None, &mut buf, t0()).is_some());
        assert!(dedup.admit(&report("10.0.0.6", "DoS"), None, &mut buf, t0()).is_some());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn evicted_alert_no_longer_suppresses() {
        let dedup = EventDeduplicator::default();
        let mut buf = AlertBuffer::new(1);

        dedup.admit(&report("10.0.0.5", "DoS"), None, &mut buf, t0());
        dedup.admit(&report("10.0.0.6", "DoS"), None, &mut buf, t0());
        assert!(dedup.admit(&report("10.0.0.5", "DoS"), None, &mut buf, t0()).is_some());
    }

    #[test]
    fn record_fields_are_normalized() {
        let dedup = EventDeduplicator::default();
        let mut buf = AlertBuffer::new(10);
        let mut r = report("192.168.1.9", "Probe");
        r.severity = Some("nonsense".into());
        r.confidence = Some(7.5);
        r.timestamp = Some("2026-10-19T09:59:58.5".into());

        let rec = dedup.admit(&r, None, &mut buf, t0()).unwrap();
        assert_eq!(rec.severity, AlertSeverity::Medium);
        assert_eq!(rec.confidence, 1.0);
        assert_eq!(rec.dedup_key, "192.168.1.9_Probe");
        assert_eq!(rec.message, "Probe attack detected from 192.168.1.9");
        assert_eq!(rec.timestamp, Some(t0() - TimeDelta::milliseconds(1500)));
        assert_eq!(rec.received_at, t0());
    }

    #[test]
    fn details_become_the_message() {
        let dedup = EventDeduplicator::default();
        let mut buf = AlertBuffer::new(10);
        let mut r = report("10.0.0.5", "DoS");
        r.details = Some("SYN flood on port 80".into());

        let rec = dedup.admit(&r, None, &mut buf, t0()).unwrap();
        assert_eq!(rec.message, "SYN flood on port 80");
    }
}
