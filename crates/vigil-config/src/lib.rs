//! Shared configuration for the vigil CLI.
//!
//! TOML profiles, bearer-token resolution (env + keyring + plaintext), and
//! translation to `vigil_core::MonitorConfig`. Core never reads files; the
//! CLI layers its flag overrides on top of what this crate produces.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use vigil_core::{MonitorConfig, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/api-token`.
pub const KEYRING_SERVICE: &str = "vigil";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "VIGIL_CONFIG";

pub const DEFAULT_BACKEND: &str = "http://localhost:8000/api/v1";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile. Every pipeline tunable is optional; unset
/// fields fall back to `MonitorConfig::default()`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// REST API root (e.g., "http://localhost:8000/api/v1").
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Live stream URL. Derived from `backend` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,

    /// Bearer token (plaintext -- prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Environment variable name containing the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token_env: Option<String>,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Request timeout, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Snapshot polling period, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,

    /// Stream heartbeat period, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval: Option<u64>,

    /// Reconnect delay after an unexpected close, milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_delay_ms: Option<u64>,

    /// Alert dedup window, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup_window: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_capacity: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_log_capacity: Option<usize>,
}

fn default_backend() -> String {
    DEFAULT_BACKEND.into()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            stream_url: None,
            api_token: None,
            api_token_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            poll_interval: None,
            heartbeat_interval: None,
            reconnect_delay_ms: None,
            dedup_window: None,
            alert_capacity: None,
            traffic_log_capacity: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$VIGIL_CONFIG`, else the platform
/// config dir.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "vigil", "vigil").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vigil");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file + environment. `VIGIL_DEFAULTS__TIMEOUT=5`
/// style variables reach nested keys.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VIGIL_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile & token resolution ──────────────────────────────────────

impl Config {
    /// Profile name to use: explicit choice, then `default_profile`, then
    /// "default".
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/api-token")
}

/// Resolve the bearer token from the credential chain. A token is optional:
/// an unauthenticated backend simply gets `None`.
pub fn resolve_api_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's api_token_env -> env var lookup
    if let Some(ref env_name) = profile.api_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile
        .api_token
        .as_ref()
        .map(|token| SecretString::from(token.clone()))
}

/// Store a bearer token in the system keyring.
pub fn store_api_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))?;
    entry.set_password(token)?;
    Ok(())
}

fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    value.parse().map_err(|e: url::ParseError| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{value}': {e}"),
    })
}

/// Build a `MonitorConfig` from a profile. `api_token` is passed in so the
/// caller decides how (and whether) to run the credential chain.
pub fn profile_to_monitor_config(
    profile: &Profile,
    api_token: Option<SecretString>,
) -> Result<MonitorConfig, ConfigError> {
    let api_url = parse_url("backend", &profile.backend)?;
    let stream_url = profile
        .stream_url
        .as_deref()
        .map(|s| parse_url("stream_url", s))
        .transpose()?;

    if let Some(ref url) = stream_url {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::Validation {
                field: "stream_url".into(),
                reason: format!("expected a ws:// or wss:// URL, got '{url}'"),
            });
        }
    }

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let defaults = MonitorConfig::default();
    let secs = |v: Option<u64>, fallback: Duration| v.map_or(fallback, Duration::from_secs);

    Ok(MonitorConfig {
        api_url,
        stream_url,
        api_token,
        tls,
        timeout: secs(profile.timeout, defaults.timeout),
        poll_interval: secs(profile.poll_interval, defaults.poll_interval),
        heartbeat_interval: secs(profile.heartbeat_interval, defaults.heartbeat_interval),
        reconnect_delay: profile
            .reconnect_delay_ms
            .map_or(defaults.reconnect_delay, Duration::from_millis),
        dedup_window: secs(profile.dedup_window, defaults.dedup_window),
        alert_capacity: profile.alert_capacity.unwrap_or(defaults.alert_capacity),
        traffic_log_capacity: profile
            .traffic_log_capacity
            .unwrap_or(defaults.traffic_log_capacity),
        ..defaults
    })
}
