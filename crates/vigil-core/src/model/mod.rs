// ── Domain model ──
//
// Dashboard-facing types. These are what the live pipeline publishes;
// wire shapes stay in vigil-api.

mod alert;
mod metrics;
mod snapshot;

use std::sync::Arc;
use std::time::Duration;

pub use alert::{AlertRecord, AlertSeverity, TrafficSample};
pub use metrics::{LiveMetrics, NetworkMetrics, ThreatLevel};
pub use snapshot::Snapshot;

/// User-facing notices emitted by the live pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The live stream opened.
    Connected,
    /// An open live stream went away.
    Disconnected,
    /// A reopen attempt is scheduled after `delay`.
    ReconnectScheduled { delay: Duration },
    /// A new, non-duplicate alert was admitted.
    Alert(Arc<AlertRecord>),
}
