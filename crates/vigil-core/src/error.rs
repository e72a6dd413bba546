// ── Core error types ──
//
// User-facing errors from vigil-core. Consumers never see reqwest or
// tungstenite errors directly; `From<vigil_api::Error>` folds transport
// failures into the variants below.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach NIDS backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Backend request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Live stream unavailable: {reason}")]
    StreamUnavailable { reason: String },

    // ── Backend errors ───────────────────────────────────────────────
    #[error("Backend rejected the request (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Unexpected response from backend: {message}")]
    InvalidResponse { message: String },

    // ── Usage errors ─────────────────────────────────────────────────
    #[error("Monitor already shut down")]
    ShutDown,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` when retrying later has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::StreamUnavailable { .. } => {
                true
            }
            Self::Backend { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Fill in the configured timeout when the transport could not say.
    pub(crate) fn with_timeout(self, timeout: std::time::Duration) -> Self {
        match self {
            Self::Timeout { timeout_secs: 0 } => Self::Timeout {
                timeout_secs: timeout.as_secs(),
            },
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vigil_api::Error> for CoreError {
    fn from(err: vigil_api::Error) -> Self {
        match err {
            vigil_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if let Some(status) = e.status() {
                    CoreError::Backend {
                        status: status.as_u16(),
                        message: e.to_string(),
                    }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                }
            }
            vigil_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            vigil_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            vigil_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            vigil_api::Error::Backend { status, message } => CoreError::Backend { status, message },
            vigil_api::Error::InvalidRequest(message) => CoreError::Config { message },
            vigil_api::Error::WebSocketConnect(reason) => CoreError::StreamUnavailable { reason },
            vigil_api::Error::WebSocketClosed { code, reason } => CoreError::StreamUnavailable {
                reason: format!("closed with code {code}: {reason}"),
            },
            vigil_api::Error::InvalidFrame { message }
            | vigil_api::Error::Deserialization { message, .. } => {
                CoreError::InvalidResponse { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_keep_status() {
        let err: CoreError = vigil_api::Error::Backend {
            status: 503,
            message: "down".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Backend { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn decode_failures_are_not_transient() {
        let err: CoreError = vigil_api::Error::Deserialization {
            message: "missing field".into(),
            body: "{}".into(),
        }
        .into();
        assert!(matches!(err, CoreError::InvalidResponse { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn websocket_failures_map_to_stream_unavailable() {
        let err: CoreError = vigil_api::Error::WebSocketConnect("refused".into()).into();
        assert!(matches!(err, CoreError::StreamUnavailable { ref reason } if reason == "refused"));
    }

    #[test]
    fn unknown_timeout_takes_the_configured_one() {
        let err = CoreError::Timeout { timeout_secs: 0 }.with_timeout(std::time::Duration::from_secs(30));
        assert!(matches!(err, CoreError::Timeout { timeout_secs: 30 }));

        let kept = CoreError::Timeout { timeout_secs: 5 }.with_timeout(std::time::Duration::from_secs(30));
        assert!(matches!(kept, CoreError::Timeout { timeout_secs: 5 }));
    }
}
