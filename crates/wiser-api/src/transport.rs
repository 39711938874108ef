// Shared transport configuration for building reqwest::Client instances.
//
// The hub speaks plain HTTP on the local network, so the only knobs are
// timeouts and the user agent.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

const USER_AGENT: &str = concat!("wiser/", env!("CARGO_PKG_VERSION"));

/// Name of the header carrying the hub secret.
pub const SECRET_HEADER: &str = "secret";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Transport)
    }
}

/// Headers sent with every hub request.
///
/// `Content-Type: application/json`, `accept: */*`, and `secret` when one
/// is configured.
pub fn request_headers(secret: Option<&SecretString>) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

    if let Some(secret) = secret.filter(|s| !s.expose_secret().is_empty()) {
        let mut value = HeaderValue::from_str(secret.expose_secret()).map_err(|_| {
            Error::InvalidHeader {
                name: SECRET_HEADER,
            }
        })?;
        value.set_sensitive(true);
        headers.insert(SECRET_HEADER, value);
    }

    Ok(headers)
}
