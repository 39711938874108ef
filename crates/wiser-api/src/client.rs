// Hub domain API HTTP client
//
// Wraps `reqwest::Client` with the hub's URL layout and response
// handling. Stateless apart from the HTTP connection pool: caching,
// polling and retries live in `wiser-core`.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::model::RequestType;
use crate::registry::DeviceRegistry;
use crate::snapshot::HubSnapshot;
use crate::transport::{TransportConfig, request_headers};

const DOMAIN_PATH: &str = "data/v2/domain/";

/// Raw HTTP client for the hub's `/data/v2/domain/` API.
#[derive(Clone)]
pub struct HubClient {
    http: reqwest::Client,
    base_url: Url,
    registry: Arc<DeviceRegistry>,
}

impl HubClient {
    /// Create a client for a hub at `endpoint` (`host` or `host:port`).
    pub fn new(endpoint: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url_for(endpoint)?))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            registry: Arc::new(DeviceRegistry::wiser()),
        }
    }

    /// Replace the family registry used to validate snapshots.
    pub fn with_registry(mut self, registry: DeviceRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/data/v2/domain/`
    pub fn domain_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join(DOMAIN_PATH)?)
    }

    /// `{base}/data/v2/domain/{tag}/{id}/{RequestAction|RequestOverride}`
    pub fn command_url(&self, tag: &str, id: u64, request_type: RequestType) -> Result<Url, Error> {
        let path = format!("{DOMAIN_PATH}{tag}/{id}/{request_type}");
        Ok(self.base_url.join(&path)?)
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Fetch, parse and validate one full snapshot.
    pub async fn fetch_snapshot(&self, secret: Option<&SecretString>) -> Result<HubSnapshot, Error> {
        let url = self.domain_url()?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .headers(request_headers(secret)?)
            .send()
            .await
            .map_err(Error::Transport)?;

        let body = read_body(resp).await?;

        let json: Value = serde_json::from_str(&body).map_err(|e| Error::Parse {
            message: e.to_string(),
            body: body.clone(),
        })?;

        HubSnapshot::from_json(json, &self.registry)
    }

    /// Send one PATCH write request. Unknown family tags are rejected
    /// before anything goes on the wire.
    pub async fn request(
        &self,
        tag: &str,
        id: u64,
        request_type: RequestType,
        body: &Value,
        secret: Option<&SecretString>,
    ) -> Result<(), Error> {
        self.registry.get(tag)?;
        let url = self.command_url(tag, id, request_type)?;
        debug!(%tag, id, %request_type, "PATCH {}", url);

        let resp = self
            .http
            .patch(url)
            .headers(request_headers(secret)?)
            .body(body.to_string())
            .send()
            .await
            .map_err(Error::Transport)?;

        read_body(resp).await.map(|_| ())
    }
}

/// Read the full body, turning non-success statuses into [`Error::Status`].
async fn read_body(resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    if status.is_success() {
        Ok(body)
    } else {
        Err(Error::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn base_url_for(endpoint: &str) -> Result<Url, Error> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let endpoint = endpoint.strip_prefix("http://").unwrap_or(endpoint);
    Ok(Url::parse(&format!("http://{endpoint}/"))?)
}
