// Shared transport configuration for building reqwest::Client instances.
//
// The REST client and the websocket session share TLS and timeout settings
// through this module. The bearer token (for backends deployed behind an
// authenticating proxy) is injected as a default header.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

const USER_AGENT: &str = concat!("vigil/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode (api-level mirror of core's TlsVerification).
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed lab deployments).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub bearer_token: Option<SecretString>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            bearer_token: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        if let Some(header) = self.authorization_header()? {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, header);
            builder = builder.default_headers(headers);
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// `Authorization: Bearer …` value, marked sensitive so it never shows
    /// up in debug output.
    pub fn authorization_header(&self) -> Result<Option<HeaderValue>, Error> {
        let Some(ref token) = self.bearer_token else {
            return Ok(None);
        };
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| Error::InvalidRequest("API token contains invalid characters".into()))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn no_token_means_no_header() {
        let config = TransportConfig::default();
        assert!(config.authorization_header().unwrap().is_none());
    }

    #[test]
    fn token_becomes_sensitive_bearer_header() {
        let config = TransportConfig {
            bearer_token: Some(SecretString::from("s3cret".to_string())),
            ..TransportConfig::default()
        };
        let header = config.authorization_header().unwrap().unwrap();
        assert!(header.is_sensitive());
        assert_eq!(header.to_str().unwrap(), "Bearer s3cret");
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let config = TransportConfig {
            bearer_token: Some(SecretString::from("bad\ntoken".to_string())),
            ..TransportConfig::default()
        };
        assert!(matches!(
            config.authorization_header(),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn default_client_builds() {
        TransportConfig::default().build_client().unwrap();
    }
}
