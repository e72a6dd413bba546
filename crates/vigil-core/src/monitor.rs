// ── Live monitor ──
//
// Facade over the live pipeline. `start()` spawns two tasks:
//
//   poller  ── Snapshot ──┐
//                         ├──> monitor loop ──> LiveStore (watch) + notifications
//   session ── events  ───┘
//
// The monitor loop exclusively owns the connection manager, reconciler,
// deduplicator and buffers, so no state is shared behind locks.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use vigil_api::{
    AttackType, HealthResponse, MonitoringStatus, NidsClient, SessionConfig, SessionMessage,
    SimulationResponse, StreamMessage, decode_frame,
};

use crate::buffer::AlertBuffer;
use crate::config::MonitorConfig;
use crate::connection::{ConnectionManager, ConnectionNotice, ConnectionState, ReconnectPolicy};
use crate::dedup::EventDeduplicator;
use crate::error::CoreError;
use crate::model::{AlertRecord, LiveMetrics, Notification, Snapshot, TrafficSample};
use crate::poller::SnapshotPoller;
use crate::reconcile::{MetricsReconciler, traffic_sample};
use crate::store::{AlertList, LiveStore, TrafficLog};
use crate::stream::Subscription;

const CONTROL_CHANNEL_SIZE: usize = 8;
const SNAPSHOT_CHANNEL_SIZE: usize = 4;
const NOTIFICATION_CHANNEL_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamControl {
    Connect,
    Disconnect,
}

// ── LiveMonitor ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable. Dropping the last clone cancels the background
/// tasks; [`shutdown`](Self::shutdown) does the same and waits for them.
#[derive(Clone)]
pub struct LiveMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    client: NidsClient,
    store: Arc<LiveStore>,
    notifications: broadcast::Sender<Notification>,
    control_tx: mpsc::Sender<StreamControl>,
    control_rx: Mutex<Option<mpsc::Receiver<StreamControl>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl LiveMonitor {
    /// Build a monitor and its REST client. Does NOT start anything --
    /// call [`start()`](Self::start).
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        let client = NidsClient::new(config.api_url.clone(), &config.transport())?;
        Ok(Self::with_client(config, client))
    }

    /// Build a monitor around an existing client.
    pub fn with_client(config: MonitorConfig, client: NidsClient) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_SIZE);

        Self {
            inner: Arc::new(MonitorInner {
                config,
                client,
                store: Arc::new(LiveStore::new()),
                notifications,
                control_tx,
                control_rx: Mutex::new(Some(control_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &NidsClient {
        &self.inner.client
    }

    pub fn store(&self) -> &Arc<LiveStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the snapshot poller and the monitor loop, and open the live
    /// stream if enabled. Calling it again is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }

        let mut pending_rx = inner.control_rx.lock().await;
        if pending_rx.is_none() {
            debug!("monitor already started");
            return Ok(());
        }

        let config = &inner.config;
        let stream_url = match config.stream_url {
            Some(ref url) => url.clone(),
            None => inner.client.stream_url()?,
        };
        let Some(control_rx) = pending_rx.take() else {
            return Ok(());
        };

        let (snapshot_tx, snapshot_rx) = mpsc::channel(SNAPSHOT_CHANNEL_SIZE);
        let poller = SnapshotPoller::new(inner.client.clone(), config.poll_interval);

        let session_config = SessionConfig {
            url: stream_url,
            bearer_token: config.api_token.clone(),
            connect_timeout: config.connect_timeout,
        };
        let (connection, session_rx) = ConnectionManager::new(
            session_config,
            config.heartbeat_interval,
            ReconnectPolicy {
                reconnect_delay: config.reconnect_delay,
                failure_backoff: config.connect_failure_backoff,
            },
        );

        let task = MonitorTask {
            store: Arc::clone(&inner.store),
            notifications: inner.notifications.clone(),
            connection,
            session_rx,
            snapshot_rx,
            control_rx,
            reconciler: MetricsReconciler::new(),
            dedup: EventDeduplicator::new(config.dedup_window),
            alerts: AlertBuffer::new(config.alert_capacity),
            traffic_log: AlertBuffer::new(config.traffic_log_capacity),
            stream_enabled: config.stream_enabled,
            cancel: inner.cancel.clone(),
        };

        let mut handles = inner.task_handles.lock().await;
        handles.push(poller.spawn(snapshot_tx, inner.cancel.clone()));
        handles.push(tokio::spawn(task.run()));

        info!(api = %config.api_url, stream = config.stream_enabled, "live monitor started");
        Ok(())
    }

    /// Stop everything: close the stream (no reconnect), stop polling, and
    /// wait for the background tasks to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.store.set_connection_state(ConnectionState::Disconnected);
        debug!("live monitor shut down");
    }

    /// Reopen the live stream after [`disconnect_stream`](Self::disconnect_stream).
    pub async fn connect_stream(&self) -> Result<(), CoreError> {
        self.control(StreamControl::Connect).await
    }

    /// Close the live stream without stopping snapshot polling.
    pub async fn disconnect_stream(&self) -> Result<(), CoreError> {
        self.control(StreamControl::Disconnect).await
    }

    async fn control(&self, control: StreamControl) -> Result<(), CoreError> {
        self.inner
            .control_tx
            .send(control)
            .await
            .map_err(|_| CoreError::ShutDown)
    }

    // ── One-shot operations ──────────────────────────────────────

    /// Poll once and reconcile, without starting anything. Returns the
    /// snapshot alongside the metrics it reconciles to.
    pub async fn fetch_once(&self) -> Result<(Snapshot, Arc<LiveMetrics>), CoreError> {
        let mut poller = SnapshotPoller::new(self.inner.client.clone(), self.inner.config.poll_interval);
        let snapshot = poller.poll_once().await.map_err(|e| self.timed(e))?;
        let mut reconciler = MetricsReconciler::new();
        reconciler.apply_snapshot(&snapshot);
        Ok((snapshot, Arc::clone(reconciler.current())))
    }

    pub async fn monitoring_status(&self) -> Result<MonitoringStatus, CoreError> {
        self.inner
            .client
            .monitoring_status()
            .await
            .map_err(|e| self.timed(e.into()))
    }

    pub async fn simulate_attack(&self, attack_type: AttackType) -> Result<SimulationResponse, CoreError> {
        self.inner
            .client
            .simulate_attack(attack_type)
            .await
            .map_err(|e| self.timed(e.into()))
    }

    pub async fn health(&self) -> Result<HealthResponse, CoreError> {
        self.inner
            .client
            .health()
            .await
            .map_err(|e| self.timed(e.into()))
    }

    fn timed(&self, err: CoreError) -> CoreError {
        err.with_timeout(self.inner.config.timeout)
    }

    // ── State observation ────────────────────────────────────────

    pub fn connection_state(&self) -> Subscription<ConnectionState> {
        self.inner.store.subscribe_connection()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifications.subscribe()
    }

    pub fn metrics(&self) -> Subscription<Arc<LiveMetrics>> {
        self.inner.store.subscribe_metrics()
    }

    pub fn alerts(&self) -> Subscription<AlertList> {
        self.inner.store.subscribe_alerts()
    }

    pub fn traffic_log(&self) -> Subscription<TrafficLog> {
        self.inner.store.subscribe_traffic_log()
    }

    pub fn metrics_snapshot(&self) -> Arc<LiveMetrics> {
        self.inner.store.metrics_snapshot()
    }

    pub fn alerts_snapshot(&self) -> AlertList {
        self.inner.store.alerts_snapshot()
    }
}

// ── Monitor loop ─────────────────────────────────────────────────

struct MonitorTask {
    store: Arc<LiveStore>,
    notifications: broadcast::Sender<Notification>,
    connection: ConnectionManager,
    session_rx: mpsc::Receiver<SessionMessage>,
    snapshot_rx: mpsc::Receiver<Snapshot>,
    control_rx: mpsc::Receiver<StreamControl>,
    reconciler: MetricsReconciler,
    dedup: EventDeduplicator,
    alerts: AlertBuffer<AlertRecord>,
    traffic_log: AlertBuffer<TrafficSample>,
    stream_enabled: bool,
    cancel: CancellationToken,
}

impl MonitorTask {
    async fn run(mut self) {
        if self.stream_enabled {
            let notices = self.connection.connect();
            self.handle_notices(notices);
        }

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                Some(control) = self.control_rx.recv() => {
                    let notices = match control {
                        StreamControl::Connect => self.connection.connect(),
                        StreamControl::Disconnect => self.connection.disconnect(),
                    };
                    self.handle_notices(notices);
                }
                Some(msg) = self.session_rx.recv() => {
                    let notices = self.connection.handle_session_message(msg);
                    self.handle_notices(notices);
                }
                Some(snapshot) = self.snapshot_rx.recv() => self.on_snapshot(&snapshot),
                timer = self.connection.next_timer() => {
                    let notices = self.connection.handle_timer(timer);
                    self.handle_notices(notices);
                }
            }
        }

        let was_connected = self.connection.state() == ConnectionState::Connected;
        let Self {
            connection,
            session_rx,
            store,
            notifications,
            ..
        } = self;
        connection.shutdown(session_rx).await;
        store.set_connection_state(ConnectionState::Disconnected);
        if was_connected {
            let _ = notifications.send(Notification::Disconnected);
        }
        debug!("monitor loop stopped");
    }

    fn handle_notices(&mut self, notices: Vec<ConnectionNotice>) {
        for notice in notices {
            match notice {
                ConnectionNotice::Frame(text) => self.on_frame(&text),
                ConnectionNotice::Connected => self.notify(Notification::Connected),
                ConnectionNotice::Disconnected => self.notify(Notification::Disconnected),
                ConnectionNotice::ReconnectScheduled(delay) => {
                    self.notify(Notification::ReconnectScheduled { delay });
                }
            }
        }
        self.store.set_connection_state(self.connection.state());
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        self.store.mark_snapshot(snapshot.fetched_at);
        if let Some(metrics) = self.reconciler.apply_snapshot(snapshot) {
            self.store.publish_metrics(metrics);
        }
    }

    fn on_frame(&mut self, text: &str) {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "dropping stream frame");
                return;
            }
        };
        self.store.mark_message();
        trace!(kind = frame.message.kind(), "stream frame");

        match frame.message {
            StreamMessage::TrafficUpdate(update) => {
                let sample = traffic_sample(&update, frame.timestamp, Utc::now());
                self.traffic_log.push(sample);
                self.store.publish_traffic_log(self.traffic_log.to_vec());

                if let Some(metrics) = self.reconciler.apply_traffic_update(&update) {
                    self.store.publish_metrics(metrics);
                }
            }
            StreamMessage::AttackDetected(report) => {
                let admitted = self
                    .dedup
                    .admit(&report, frame.timestamp, &mut self.alerts, Utc::now());
                if let Some(alert) = admitted {
                    info!(
                        source = %alert.source_ip,
                        attack = %alert.attack_type,
                        severity = %alert.severity,
                        "intrusion alert"
                    );
                    self.store.publish_alerts(self.alerts.to_vec());
                    self.notify(Notification::Alert(alert));
                }
            }
            StreamMessage::Pong => self.store.mark_pong(),
            StreamMessage::Ping => trace!("server ping"),
            StreamMessage::LogAnalysis(_) => trace!("log analysis frame not reconciled"),
        }
    }

    fn notify(&self, notification: Notification) {
        // No receivers is fine.
        let _ = self.notifications.send(notification);
    }
}
