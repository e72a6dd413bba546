// ── Live stream connection manager ──
//
// Drives `ConnectionMachine` against real sessions and timers. Owns at most
// one `WebSocketSession` at a time, the heartbeat interval, and the pending
// reconnect deadline. Session events are tagged with a generation id so a
// late event from a superseded session can never move the machine.

mod machine;

use std::future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use vigil_api::{ClientMessage, SessionConfig, SessionEvent, SessionMessage, WebSocketSession};

pub use machine::{
    ConnectionAction, ConnectionEvent, ConnectionMachine, ConnectionState, ReconnectPolicy,
};

const SESSION_EVENT_CAPACITY: usize = 256;

/// What the manager surfaced while handling an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionNotice {
    Connected,
    Disconnected,
    ReconnectScheduled(Duration),
    /// A text frame from the current, open session.
    Frame(String),
}

/// A timer owned by the manager fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTimer {
    Heartbeat,
    Reconnect,
}

pub struct ConnectionManager {
    machine: ConnectionMachine,
    session_config: SessionConfig,
    heartbeat_interval: Duration,
    events_tx: mpsc::Sender<SessionMessage>,
    session: Option<WebSocketSession>,
    generation: u64,
    heartbeat: Option<Interval>,
    reconnect_at: Option<Instant>,
}

impl ConnectionManager {
    /// Create a manager and the receiver its sessions report into. The
    /// owner must feed everything from the receiver back through
    /// [`handle_session_message`](Self::handle_session_message).
    pub fn new(
        session_config: SessionConfig,
        heartbeat_interval: Duration,
        policy: ReconnectPolicy,
    ) -> (Self, mpsc::Receiver<SessionMessage>) {
        let (events_tx, events_rx) = mpsc::channel(SESSION_EVENT_CAPACITY);
        let manager = Self {
            machine: ConnectionMachine::new(policy),
            session_config,
            heartbeat_interval,
            events_tx,
            session: None,
            generation: 0,
            heartbeat: None,
            reconnect_at: None,
        };
        (manager, events_rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Number of sessions opened so far.
    pub fn sessions_opened(&self) -> u64 {
        self.generation
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_at.is_some()
    }

    // ── Consumer requests ────────────────────────────────────────────

    /// Open the stream unless it is already open or opening.
    pub fn connect(&mut self) -> Vec<ConnectionNotice> {
        self.dispatch(ConnectionEvent::ConnectRequested)
    }

    /// Close the stream and suppress any reconnect.
    pub fn disconnect(&mut self) -> Vec<ConnectionNotice> {
        self.dispatch(ConnectionEvent::DisconnectRequested)
    }

    /// Disconnect and wait for the session task to finish.
    ///
    /// `events` is the receiver returned by [`new`](Self::new). It is dropped
    /// first: a session blocked reporting into a full channel only sees the
    /// close once its pending send fails.
    pub async fn shutdown(mut self, events: mpsc::Receiver<SessionMessage>) {
        drop(events);
        self.machine.handle(ConnectionEvent::DisconnectRequested);
        self.heartbeat = None;
        self.reconnect_at = None;
        if let Some(session) = self.session.take() {
            session.shutdown().await;
        }
    }

    // ── Inputs ───────────────────────────────────────────────────────

    pub fn handle_session_message(&mut self, msg: SessionMessage) -> Vec<ConnectionNotice> {
        let current = self.session.as_ref().map(WebSocketSession::id);
        if current != Some(msg.session) {
            trace!(session = msg.session, ?current, "ignoring event from superseded session");
            return Vec::new();
        }

        match msg.event {
            SessionEvent::Opened => self.dispatch(ConnectionEvent::Opened),
            SessionEvent::OpenFailed(e) => {
                warn!(error = %e, "live stream connection failed");
                self.session = None;
                self.dispatch(ConnectionEvent::OpenFailed)
            }
            SessionEvent::Text(text) => {
                if self.machine.state() == ConnectionState::Connected {
                    vec![ConnectionNotice::Frame(text)]
                } else {
                    Vec::new()
                }
            }
            SessionEvent::Error(e) => {
                warn!(error = %e, "live stream error");
                self.dispatch(ConnectionEvent::Error)
            }
            SessionEvent::Closed { code, reason } => {
                info!(?code, reason, "live stream closed");
                self.session = None;
                self.dispatch(ConnectionEvent::Closed)
            }
        }
    }

    /// Wait for the next heartbeat tick or reconnect deadline. Pends
    /// forever when neither is armed. Cancel-safe.
    pub async fn next_timer(&mut self) -> ConnectionTimer {
        let reconnect_at = self.reconnect_at;
        tokio::select! {
            () = sleep_until_opt(reconnect_at) => ConnectionTimer::Reconnect,
            () = tick_opt(self.heartbeat.as_mut()) => ConnectionTimer::Heartbeat,
        }
    }

    pub fn handle_timer(&mut self, timer: ConnectionTimer) -> Vec<ConnectionNotice> {
        match timer {
            ConnectionTimer::Heartbeat => {
                if let Some(ref session) = self.session {
                    if !session.send_text(ClientMessage::Ping.to_frame()) {
                        debug!("heartbeat ping not queued");
                    }
                }
                Vec::new()
            }
            ConnectionTimer::Reconnect => {
                self.reconnect_at = None;
                debug!("reconnect delay elapsed");
                self.dispatch(ConnectionEvent::ReconnectDue)
            }
        }
    }

    // ── Action execution ─────────────────────────────────────────────

    fn dispatch(&mut self, event: ConnectionEvent) -> Vec<ConnectionNotice> {
        let actions = self.machine.handle(event);
        trace!(?event, ?actions, state = %self.machine.state(), "connection transition");

        let mut notices = Vec::new();
        for action in actions {
            match action {
                ConnectionAction::Open => self.open_session(),
                ConnectionAction::Close => {
                    if let Some(session) = self.session.take() {
                        session.close();
                    }
                }
                ConnectionAction::StartHeartbeat => {
                    let period = self.heartbeat_interval;
                    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.heartbeat = Some(interval);
                }
                ConnectionAction::StopHeartbeat => self.heartbeat = None,
                ConnectionAction::ScheduleReconnect(delay) => {
                    info!(delay_ms = delay.as_millis(), "scheduling live stream reconnect");
                    self.reconnect_at = Some(Instant::now() + delay);
                    notices.push(ConnectionNotice::ReconnectScheduled(delay));
                }
                ConnectionAction::CancelReconnect => self.reconnect_at = None,
                ConnectionAction::NotifyConnected => notices.push(ConnectionNotice::Connected),
                ConnectionAction::NotifyDisconnected => {
                    notices.push(ConnectionNotice::Disconnected);
                }
            }
        }
        notices
    }

    fn open_session(&mut self) {
        if let Some(stale) = self.session.take() {
            stale.close();
        }
        self.generation += 1;
        self.session = Some(WebSocketSession::spawn(
            self.session_config.clone(),
            self.generation,
            self.events_tx.clone(),
        ));
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

async fn tick_opt(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}
