//! Single live-stream WebSocket session.
//!
//! [`WebSocketSession::spawn`] opens one connection in a background task and
//! reports what happens to it -- opened, open failed, text frame, error,
//! closed -- as [`SessionEvent`]s tagged with the session id. The task never
//! reconnects on its own: reconnection policy belongs to the caller, which
//! decides from these events whether and when to spawn the next session.
//!
//! # Example
//!
//! ```rust,ignore
//! use vigil_api::websocket::{SessionConfig, WebSocketSession};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(256);
//! let session = WebSocketSession::spawn(SessionConfig::new(url), 1, tx);
//!
//! while let Some(msg) = rx.recv().await {
//!     println!("session {}: {:?}", msg.session, msg.event);
//! }
//!
//! session.close();
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tracing::{debug, info, trace};
use url::Url;

use crate::error::Error;

const COMMAND_CHANNEL_CAPACITY: usize = 16;

// ── Configuration ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub url: Url,
    pub bearer_token: Option<SecretString>,
    /// Upper bound on the TCP + TLS + upgrade handshake.
    pub connect_timeout: Duration,
}

impl SessionConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            bearer_token: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// ── Events & commands ────────────────────────────────────────────────

/// Something that happened to a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// Handshake completed.
    Opened,
    /// Handshake failed; the session is over and no `Closed` follows.
    OpenFailed(Error),
    /// A text frame arrived.
    Text(String),
    /// Transport error on an open connection. A `Closed` always follows.
    Error(Error),
    /// The connection is gone.
    Closed { code: Option<u16>, reason: String },
}

/// A [`SessionEvent`] tagged with the id of the session that produced it.
#[derive(Debug)]
pub struct SessionMessage {
    pub session: u64,
    pub event: SessionEvent,
}

#[derive(Debug)]
enum SessionCommand {
    SendText(String),
    Close,
}

// ── WebSocketSession ─────────────────────────────────────────────────

/// Handle to one running connection attempt.
///
/// Dropping the handle closes the command channel, which the task treats
/// the same as [`close`](Self::close).
#[derive(Debug)]
pub struct WebSocketSession {
    id: u64,
    command_tx: mpsc::Sender<SessionCommand>,
    handle: JoinHandle<()>,
}

impl WebSocketSession {
    /// Spawn the connection task. Returns immediately; the handshake result
    /// arrives on `events` as `Opened` or `OpenFailed`.
    pub fn spawn(config: SessionConfig, id: u64, events: mpsc::Sender<SessionMessage>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let handle = tokio::spawn(session_task(config, id, events, command_rx));
        Self {
            id,
            command_tx,
            handle,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a text frame. Returns `false` if the session is gone or its
    /// outbound queue is full.
    pub fn send_text(&self, text: String) -> bool {
        self.command_tx.try_send(SessionCommand::SendText(text)).is_ok()
    }

    /// Ask the task to send a close frame and finish.
    pub fn close(&self) {
        let _ = self.command_tx.try_send(SessionCommand::Close);
    }

    /// Close, then wait for the task to finish.
    pub async fn shutdown(self) {
        self.close();
        drop(self.command_tx);
        let _ = self.handle.await;
    }
}

// ── Session task ─────────────────────────────────────────────────────

async fn emit(events: &mpsc::Sender<SessionMessage>, session: u64, event: SessionEvent) {
    // Send errors just mean the consumer is gone.
    let _ = events.send(SessionMessage { session, event }).await;
}

fn build_request(config: &SessionConfig) -> Result<ClientRequestBuilder, Error> {
    let uri: tungstenite::http::Uri = config
        .url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(ref token) = config.bearer_token {
        request = request.with_header("Authorization", format!("Bearer {}", token.expose_secret()));
    }
    Ok(request)
}

async fn session_task(
    config: SessionConfig,
    id: u64,
    events: mpsc::Sender<SessionMessage>,
    mut commands: mpsc::Receiver<SessionCommand>,
) {
    let request = match build_request(&config) {
        Ok(r) => r,
        Err(e) => {
            emit(&events, id, SessionEvent::OpenFailed(e)).await;
            return;
        }
    };

    info!(url = %config.url, session = id, "Connecting to live stream");

    let connect = tokio::time::timeout(
        config.connect_timeout,
        tokio_tungstenite::connect_async(request),
    );
    tokio::pin!(connect);

    let ws_stream = loop {
        tokio::select! {
            biased;
            cmd = commands.recv() => match cmd {
                // Nothing to write to yet.
                Some(SessionCommand::SendText(_)) => {}
                Some(SessionCommand::Close) | None => {
                    debug!(session = id, "Session closed before handshake completed");
                    return;
                }
            },
            result = &mut connect => match result {
                Ok(Ok((stream, _response))) => break stream,
                Ok(Err(e)) => {
                    emit(&events, id, SessionEvent::OpenFailed(Error::WebSocketConnect(e.to_string()))).await;
                    return;
                }
                Err(_) => {
                    let timeout_secs = config.connect_timeout.as_secs();
                    emit(&events, id, SessionEvent::OpenFailed(Error::Timeout { timeout_secs })).await;
                    return;
                }
            },
        }
    };

    info!(session = id, "Live stream connected");
    emit(&events, id, SessionEvent::Opened).await;

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            cmd = commands.recv() => match cmd {
                Some(SessionCommand::SendText(text)) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        let reason = e.to_string();
                        emit(&events, id, SessionEvent::Error(Error::WebSocketConnect(reason.clone()))).await;
                        emit(&events, id, SessionEvent::Closed { code: None, reason }).await;
                        return;
                    }
                }
                Some(SessionCommand::Close) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    let _ = write.close().await;
                    debug!(session = id, "Live stream closed by client");
                    emit(&events, id, SessionEvent::Closed {
                        code: Some(1000),
                        reason: "client disconnect".into(),
                    }).await;
                    return;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    emit(&events, id, SessionEvent::Text(text.as_str().to_owned())).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame.map_or((None, String::new()), |cf| {
                        (Some(u16::from(cf.code)), cf.reason.to_string())
                    });
                    info!(session = id, ?code, %reason, "Live stream close frame received");
                    emit(&events, id, SessionEvent::Closed { code, reason }).await;
                    return;
                }
                Some(Ok(Message::Ping(_))) => {
                    // tungstenite queues the pong reply itself
                    trace!(session = id, "WebSocket ping");
                }
                Some(Ok(_)) => {
                    // Binary, Pong, Frame -- not part of the protocol
                }
                Some(Err(e)) => {
                    let reason = e.to_string();
                    emit(&events, id, SessionEvent::Error(Error::WebSocketConnect(reason.clone()))).await;
                    emit(&events, id, SessionEvent::Closed { code: None, reason }).await;
                    return;
                }
                None => {
                    info!(session = id, "Live stream ended");
                    emit(&events, id, SessionEvent::Closed {
                        code: None,
                        reason: "stream ended".into(),
                    }).await;
                    return;
                }
            },
        }
    }
}
