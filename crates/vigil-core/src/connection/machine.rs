//! Pure connection lifecycle state machine.
//!
//! No I/O and no timers: [`ConnectionMachine::handle`] maps an event to the
//! actions the driver must perform. Keeping it pure makes the reconnect
//! rules testable without sockets or clocks.

use std::time::Duration;

use serde::Serialize;
use strum::Display;

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A consumer wants the stream open.
    ConnectRequested,
    /// The handshake completed.
    Opened,
    /// The handshake failed.
    OpenFailed,
    /// Transport error on an open connection. A `Closed` follows.
    Error,
    /// The open connection is gone.
    Closed,
    /// A consumer wants the stream shut.
    DisconnectRequested,
    /// The scheduled reconnect delay elapsed.
    ReconnectDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    Open,
    Close,
    StartHeartbeat,
    StopHeartbeat,
    ScheduleReconnect(Duration),
    CancelReconnect,
    NotifyConnected,
    NotifyDisconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// After an unexpected close of an open connection.
    pub reconnect_delay: Duration,
    /// After a failed handshake.
    pub failure_backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
            failure_backoff: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
pub struct ConnectionMachine {
    state: ConnectionState,
    /// Set by `DisconnectRequested`, cleared by `ConnectRequested`. While
    /// set, closes and failures never schedule a reconnect.
    intentional_close: bool,
    policy: ReconnectPolicy,
}

impl ConnectionMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_intentionally_closed(&self) -> bool {
        self.intentional_close
    }

    pub fn handle(&mut self, event: ConnectionEvent) -> Vec<ConnectionAction> {
        use ConnectionAction as A;
        use ConnectionEvent as E;
        use ConnectionState as S;

        match (self.state, event) {
            // At most one live connection: a second request is a no-op.
            (S::Connecting | S::Connected, E::ConnectRequested) => Vec::new(),
            (S::Disconnected, E::ConnectRequested) => {
                self.intentional_close = false;
                self.state = S::Connecting;
                vec![A::CancelReconnect, A::Open]
            }

            (S::Disconnected, E::ReconnectDue) if !self.intentional_close => {
                self.state = S::Connecting;
                vec![A::Open]
            }
            (_, E::ReconnectDue) => Vec::new(),

            (S::Connecting, E::Opened) => {
                self.state = S::Connected;
                vec![A::StartHeartbeat, A::NotifyConnected]
            }
            // Opened after a disconnect was requested: shut it straight away.
            (S::Disconnected, E::Opened) => vec![A::Close],
            (S::Connected, E::Opened) => Vec::new(),

            (S::Connecting, E::OpenFailed) => {
                self.state = S::Disconnected;
                if self.intentional_close {
                    Vec::new()
                } else {
                    vec![A::ScheduleReconnect(self.policy.failure_backoff)]
                }
            }
            (_, E::OpenFailed) => Vec::new(),

            (S::Connected, E::Error) => {
                self.state = S::Disconnected;
                vec![A::NotifyDisconnected]
            }
            (_, E::Error) => Vec::new(),

            (S::Connected | S::Disconnected, E::Closed) => {
                let mut actions = vec![A::StopHeartbeat];
                if self.state == S::Connected {
                    actions.push(A::NotifyDisconnected);
                }
                self.state = S::Disconnected;
                if !self.intentional_close {
                    actions.push(A::ScheduleReconnect(self.policy.reconnect_delay));
                }
                actions
            }
            (S::Connecting, E::Closed) => {
                // Only reachable if a session reports Closed without Opened.
                self.state = S::Disconnected;
                if self.intentional_close {
                    Vec::new()
                } else {
                    vec![A::ScheduleReconnect(self.policy.failure_backoff)]
                }
            }

            (previous, E::DisconnectRequested) => {
                self.intentional_close = true;
                self.state = S::Disconnected;
                let mut actions = vec![A::CancelReconnect, A::StopHeartbeat];
                match previous {
                    S::Connected => actions.extend([A::Close, A::NotifyDisconnected]),
                    S::Connecting => actions.push(A::Close),
                    S::Disconnected => {}
                }
                actions
            }
        }
    }
}
