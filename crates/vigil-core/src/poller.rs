//! Periodic REST snapshot poller.
//!
//! Each tick fetches `/statistics` and `/monitoring/status` concurrently and
//! folds them into one [`Snapshot`]. Statistics are required: if that call
//! fails the tick is skipped. Status is best-effort and only contributes the
//! blocked/connection counts when it answers.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use vigil_api::NidsClient;

use crate::error::CoreError;
use crate::model::Snapshot;

pub struct SnapshotPoller {
    client: NidsClient,
    interval: Duration,
    seq: u64,
}

impl SnapshotPoller {
    pub fn new(client: NidsClient, interval: Duration) -> Self {
        Self {
            client,
            interval,
            seq: 0,
        }
    }

    /// Sequence number of the most recently issued poll.
    pub fn last_seq(&self) -> u64 {
        self.seq
    }

    /// Fetch one snapshot. The sequence number is taken when the poll is
    /// issued, so a slow response still orders correctly against later ones.
    pub async fn poll_once(&mut self) -> Result<Snapshot, CoreError> {
        self.seq += 1;
        let seq = self.seq;

        let (stats, status) = tokio::join!(self.client.statistics(), self.client.monitoring_status());
        let stats = stats?;

        let status = match status {
            Ok(status) => Some(status),
            Err(e) => {
                debug!(error = %e, "monitoring status unavailable, using statistics only");
                None
            }
        };

        Ok(Snapshot::from_api(
            seq,
            &stats,
            status.as_ref().map(|s| &s.statistics),
            Utc::now(),
        ))
    }

    /// Poll on a fixed cadence until `cancel` fires or the receiver goes
    /// away. The first poll runs immediately.
    pub fn spawn(self, tx: mpsc::Sender<Snapshot>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(tx, cancel))
    }

    async fn run(mut self, tx: mpsc::Sender<Snapshot>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        // A slow backend should not trigger a burst of catch-up polls.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let result = tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        result = self.poll_once() => result,
                    };
                    match result {
                        Ok(snapshot) => {
                            if tx.send(snapshot).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, seq = self.seq, "snapshot poll failed"),
                    }
                }
            }
        }
        debug!("snapshot poller stopped");
    }
}
