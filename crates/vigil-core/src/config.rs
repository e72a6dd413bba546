// ── Runtime monitor configuration ──
//
// Describes where the backend lives and how the live pipeline is tuned.
// Carries the bearer token but never touches disk: the CLI builds a
// `MonitorConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use vigil_api::{TlsMode, TransportConfig};

/// REST base used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1/";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed lab deployments).
    DangerAcceptInvalid,
}

/// Configuration for one monitor instance.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// REST base URL, e.g. `http://localhost:8000/api/v1/`.
    pub api_url: Url,
    /// Live stream endpoint. Derived from `api_url` when `None`.
    pub stream_url: Option<Url>,
    /// Bearer token sent on REST calls and the stream handshake.
    pub api_token: Option<SecretString>,
    pub tls: TlsVerification,
    /// Per-request timeout for REST calls.
    pub timeout: Duration,
    /// Snapshot polling period.
    pub poll_interval: Duration,
    /// Application-level ping period while the stream is open.
    pub heartbeat_interval: Duration,
    /// Delay before reopening after an unexpected close.
    pub reconnect_delay: Duration,
    /// Delay before retrying after a failed handshake.
    pub connect_failure_backoff: Duration,
    /// Upper bound on the stream handshake.
    pub connect_timeout: Duration,
    /// Alerts with the same source and type inside this window are dropped.
    pub dedup_window: Duration,
    pub alert_capacity: usize,
    pub traffic_log_capacity: usize,
    /// Open the live stream at all. Off means polling only.
    pub stream_enabled: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            stream_url: None,
            api_token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(3),
            connect_failure_backoff: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            dedup_window: Duration::from_secs(60),
            alert_capacity: 10,
            traffic_log_capacity: 5000,
            stream_enabled: true,
        }
    }
}

impl MonitorConfig {
    /// Config pointing at `api_url` with every tunable at its default.
    pub fn for_backend(api_url: Url) -> Self {
        Self {
            api_url,
            ..Self::default()
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
            bearer_token: self.api_token.clone(),
        }
    }
}
