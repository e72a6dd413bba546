// ── Live store ──
//
// Publishes the outputs of the live pipeline through `watch` channels.
// The monitor loop is the only writer; any number of consumers read
// snapshots or subscribe.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::connection::ConnectionState;
use crate::model::{AlertRecord, LiveMetrics, TrafficSample};
use crate::stream::Subscription;

pub type AlertList = Arc<Vec<Arc<AlertRecord>>>;
pub type TrafficLog = Arc<Vec<Arc<TrafficSample>>>;

pub struct LiveStore {
    metrics: watch::Sender<Arc<LiveMetrics>>,
    alerts: watch::Sender<AlertList>,
    traffic_log: watch::Sender<TrafficLog>,
    connection: watch::Sender<ConnectionState>,
    last_snapshot_at: watch::Sender<Option<DateTime<Utc>>>,
    last_message_at: watch::Sender<Option<DateTime<Utc>>>,
    last_pong_at: watch::Sender<Option<DateTime<Utc>>>,
}

impl LiveStore {
    pub fn new() -> Self {
        Self {
            metrics: watch::channel(Arc::default()).0,
            alerts: watch::channel(Arc::default()).0,
            traffic_log: watch::channel(Arc::default()).0,
            connection: watch::channel(ConnectionState::Disconnected).0,
            last_snapshot_at: watch::channel(None).0,
            last_message_at: watch::channel(None).0,
            last_pong_at: watch::channel(None).0,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn metrics_snapshot(&self) -> Arc<LiveMetrics> {
        self.metrics.borrow().clone()
    }

    /// Alerts, newest first.
    pub fn alerts_snapshot(&self) -> AlertList {
        self.alerts.borrow().clone()
    }

    /// Traffic samples, newest first.
    pub fn traffic_log_snapshot(&self) -> TrafficLog {
        self.traffic_log.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub fn last_snapshot_at(&self) -> Option<DateTime<Utc>> {
        *self.last_snapshot_at.borrow()
    }

    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        *self.last_message_at.borrow()
    }

    pub fn last_pong_at(&self) -> Option<DateTime<Utc>> {
        *self.last_pong_at.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_metrics(&self) -> Subscription<Arc<LiveMetrics>> {
        Subscription::new(self.metrics.subscribe())
    }

    pub fn subscribe_alerts(&self) -> Subscription<AlertList> {
        Subscription::new(self.alerts.subscribe())
    }

    pub fn subscribe_traffic_log(&self) -> Subscription<TrafficLog> {
        Subscription::new(self.traffic_log.subscribe())
    }

    pub fn subscribe_connection(&self) -> Subscription<ConnectionState> {
        Subscription::new(self.connection.subscribe())
    }

    // ── Publishing (monitor loop only) ───────────────────────────────

    pub(crate) fn publish_metrics(&self, metrics: Arc<LiveMetrics>) {
        self.metrics.send_replace(metrics);
    }

    pub(crate) fn publish_alerts(&self, alerts: Vec<Arc<AlertRecord>>) {
        self.alerts.send_replace(Arc::new(alerts));
    }

    pub(crate) fn publish_traffic_log(&self, samples: Vec<Arc<TrafficSample>>) {
        self.traffic_log.send_replace(Arc::new(samples));
    }

    /// Only wakes subscribers when the state actually changes.
    pub(crate) fn set_connection_state(&self, state: ConnectionState) {
        self.connection.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    pub(crate) fn mark_snapshot(&self, at: DateTime<Utc>) {
        self.last_snapshot_at.send_replace(Some(at));
    }

    pub(crate) fn mark_message(&self) {
        self.last_message_at.send_replace(Some(Utc::now()));
    }

    pub(crate) fn mark_pong(&self) {
        self.last_pong_at.send_replace(Some(Utc::now()));
    }
}

impl Default for LiveStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connection_state_only_notifies_on_change() {
        let store = LiveStore::new();
        let mut sub = store.subscribe_connection();

        store.set_connection_state(ConnectionState::Disconnected);
        assert!(!sub.has_changed());

        store.set_connection_state(ConnectionState::Connecting);
        assert_eq!(sub.changed().await, Some(ConnectionState::Connecting));
    }

    #[tokio::test]
    async fn published_metrics_reach_subscribers() {
        let store = LiveStore::new();
        let mut sub = store.subscribe_metrics();
        assert!(sub.current().is_empty());

        let metrics = LiveMetrics {
            total_connections: 42,
            ..LiveMetrics::default()
        };
        store.publish_metrics(Arc::new(metrics));

        let seen = sub.changed().await;
        assert_eq!(seen.map(|m| m.total_connections), Some(42));
        assert_eq!(store.metrics_snapshot().total_connections, 42);
    }
}
