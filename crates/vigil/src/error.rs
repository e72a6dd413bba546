//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use vigil_config::ConfigError;
use vigil_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the NIDS backend at {url}")]
    #[diagnostic(
        code(vigil::connection_failed),
        help(
            "Check that the backend is running and accessible.\n\
             URL: {url}\n\
             Try: vigil health --backend {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Live stream unavailable: {reason}")]
    #[diagnostic(
        code(vigil::stream_unavailable),
        help("Set stream_url in your profile, or run with --no-stream to poll statistics only.")
    )]
    StreamUnavailable { reason: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Backend rejected the request (HTTP {status}): {message}")]
    #[diagnostic(
        code(vigil::auth_failed),
        help(
            "The backend (or a proxy in front of it) requires a bearer token.\n\
             Store one with: vigil config set-token\n\
             Or set the VIGIL_API_TOKEN environment variable."
        )
    )]
    AuthFailed { status: u16, message: String },

    #[error("Endpoint not found: {message}")]
    #[diagnostic(
        code(vigil::not_found),
        help("Check that the backend URL includes the API prefix, e.g. http://localhost:8000/api/v1")
    )]
    NotFound { message: String },

    #[error("Backend error (HTTP {status}): {message}")]
    #[diagnostic(code(vigil::backend_error))]
    Backend { status: u16, message: String },

    #[error("Unexpected response from backend: {message}")]
    #[diagnostic(
        code(vigil::invalid_response),
        help("The backend may be running an incompatible version.")
    )]
    InvalidResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vigil::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vigil::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: vigil config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("{source}")]
    #[diagnostic(code(vigil::config), help("Config file: {path}"))]
    Config {
        #[source]
        source: ConfigError,
        path: String,
    },

    #[error("Could not access the system keyring: {reason}")]
    #[diagnostic(
        code(vigil::keyring),
        help("Use api_token_env in your profile or the VIGIL_API_TOKEN environment variable instead.")
    )]
    Keyring { reason: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(vigil::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("Internal error: {message}")]
    #[diagnostic(code(vigil::internal))]
    Internal { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::StreamUnavailable { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::Keyring { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::Config { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::StreamUnavailable { reason } => CliError::StreamUnavailable { reason },

            CoreError::Backend { status, message } => match status {
                401 | 403 => CliError::AuthFailed { status, message },
                404 => CliError::NotFound { message },
                _ => CliError::Backend { status, message },
            },

            CoreError::InvalidResponse { message } => CliError::InvalidResponse { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::ShutDown => CliError::Internal {
                message: "monitor was already shut down".into(),
            },

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

impl From<vigil_api::Error> for CliError {
    fn from(err: vigil_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
            },
            ConfigError::Keyring(e) => CliError::Keyring {
                reason: e.to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                source: other,
                path: vigil_config::config_path().display().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_status_picks_the_diagnostic() {
        let auth: CliError = CoreError::Backend {
            status: 401,
            message: "missing token".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let missing: CliError = CoreError::Backend {
            status: 404,
            message: "Not Found".into(),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let server: CliError = CoreError::Backend {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert_eq!(server.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn connection_errors_exit_with_connection_code() {
        let err: CliError = CoreError::ConnectionFailed {
            url: "http://localhost:8000/api/v1/".into(),
            reason: "connection refused".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::CONNECTION);

        let timeout: CliError = CoreError::Timeout { timeout_secs: 30 }.into();
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err: CliError = ConfigError::Validation {
            field: "stream_url".into(),
            reason: "expected a ws:// or wss:// URL".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
