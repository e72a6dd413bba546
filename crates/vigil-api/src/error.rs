use thiserror::Error;

/// Top-level error type for the `vigil-api` crate.
///
/// Covers every failure mode across both backend surfaces: the REST
/// endpoints and the live monitoring stream. `vigil-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend ─────────────────────────────────────────────────────
    /// Non-2xx response from the backend. `message` carries the FastAPI
    /// `detail` field when present, otherwise the raw body.
    #[error("Backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    /// The request was rejected before it left the client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Stream ──────────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// A stream frame that is not JSON or carries an unknown `type`.
    #[error("Invalid stream frame: {message}")]
    InvalidFrame { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Server-side failures (5xx) count as transient: the backend recomputes
    /// its statistics on every request, so the next poll may well succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } | Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            Self::Backend { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Backend { status: 404, .. } => true,
            _ => false,
        }
    }

    /// HTTP status code attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}
