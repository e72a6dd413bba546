// NIDS backend HTTP client
//
// Wraps `reqwest::Client` with base-URL resolution, FastAPI error-body
// decoding, and envelope unwrapping. Every method returns the bare payload;
// callers never see the `{ "status": "success", ... }` wrapper.

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    AttackType, ErrorBody, HealthResponse, LogStatistics, MonitoringStatus, SimulationResponse,
    StatisticsEnvelope, StatusEnvelope,
};
use crate::transport::TransportConfig;

const STATISTICS_PATH: &str = "statistics";
const STATUS_PATH: &str = "monitoring/status";
const SIMULATE_PATH: &str = "monitoring/simulate-attack";
const LIVE_STREAM_PATH: &str = "monitoring/live";
const HEALTH_PATH: &str = "/health";

/// HTTP client for the NIDS backend REST API.
///
/// `base_url` is the API root, e.g. `http://localhost:8000/api/v1/`. A
/// missing trailing slash is added so relative endpoint paths resolve
/// beneath it instead of replacing the last segment.
#[derive(Debug, Clone)]
pub struct NidsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl NidsClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
        }
    }

    /// The API root every endpoint path is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Live monitoring stream URL derived from the API root
    /// (`http` → `ws`, `https` → `wss`).
    pub fn stream_url(&self) -> Result<Url, Error> {
        let mut url = self.base_url.join(LIVE_STREAM_PATH)?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|()| Error::InvalidRequest(format!("cannot derive stream URL from {url}")))?;
        Ok(url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET statistics` -- aggregate log-processing counters.
    pub async fn statistics(&self) -> Result<LogStatistics, Error> {
        let url = self.base_url.join(STATISTICS_PATH)?;
        let envelope: StatisticsEnvelope = self.get(url).await?;
        Ok(envelope.into_inner())
    }

    /// `GET monitoring/status` -- backend-side daily counters and uptime.
    pub async fn monitoring_status(&self) -> Result<MonitoringStatus, Error> {
        let url = self.base_url.join(STATUS_PATH)?;
        let envelope: StatusEnvelope = self.get(url).await?;
        Ok(envelope.into_inner())
    }

    /// `POST monitoring/simulate-attack?attack_type=<T>` -- ask the backend
    /// to broadcast a synthetic attack on the live stream.
    pub async fn simulate_attack(&self, attack_type: AttackType) -> Result<SimulationResponse, Error> {
        let mut url = self.base_url.join(SIMULATE_PATH)?;
        url.query_pairs_mut()
            .append_pair("attack_type", &attack_type.to_string());

        debug!("POST {}", url);
        let resp = self.http.post(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /health` on the server root (outside the API prefix).
    pub async fn health(&self) -> Result<HealthResponse, Error> {
        let url = self.base_url.join(HEALTH_PATH)?;
        self.get(url).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }
}

/// Check the status code, then decode the body.
///
/// Non-2xx bodies are mined for FastAPI's `detail` field so error messages
/// read like the backend intended.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| match e.detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or_else(|_| body.clone());
        return Err(Error::Backend {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
