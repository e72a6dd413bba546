// vigil-core: Live telemetry reconciliation between vigil-api and consumers (CLI).

pub mod buffer;
pub mod config;
pub mod connection;
pub mod dedup;
pub mod error;
pub mod model;
pub mod monitor;
pub mod poller;
pub mod reconcile;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use buffer::AlertBuffer;
pub use config::{MonitorConfig, TlsVerification};
pub use connection::{ConnectionManager, ConnectionState};
pub use dedup::EventDeduplicator;
pub use error::CoreError;
pub use monitor::LiveMonitor;
pub use poller::SnapshotPoller;
pub use reconcile::MetricsReconciler;
pub use store::LiveStore;
pub use stream::Subscription;

pub use model::{
    AlertRecord, AlertSeverity, LiveMetrics, NetworkMetrics, Notification, Snapshot, ThreatLevel,
    TrafficSample,
};
