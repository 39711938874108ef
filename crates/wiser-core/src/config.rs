// ── Runtime hub configuration ──
//
// These types describe *how* to reach a hub. They carry the secret
// source and timing knobs but never touch disk: `wiser-config` (or any
// other caller) builds a `HubConfig` and hands it in.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use secrecy::SecretString;

use crate::command::RetryPolicy;

/// Polling period used when none is configured.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(5000);

/// Supplies the hub secret, asynchronously, right before each request.
///
/// Returning `None` sends the request without a `secret` header.
pub trait SecretProvider: Send + Sync {
    fn secret(&self) -> BoxFuture<'_, Option<SecretString>>;
}

/// A secret fixed at startup (or no secret at all).
#[derive(Clone, Default)]
pub struct StaticSecret(Option<SecretString>);

impl StaticSecret {
    pub fn new(secret: Option<SecretString>) -> Self {
        Self(secret)
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl SecretProvider for StaticSecret {
    fn secret(&self) -> BoxFuture<'_, Option<SecretString>> {
        Box::pin(async move { self.0.clone() })
    }
}

/// Adapts an async closure into a [`SecretProvider`].
pub struct SecretFn<F>(pub F);

impl<F, Fut> SecretProvider for SecretFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Option<SecretString>> + Send + 'static,
{
    fn secret(&self) -> BoxFuture<'_, Option<SecretString>> {
        Box::pin((self.0)())
    }
}

/// Configuration for talking to a single hub.
///
/// Fixed for the lifetime of the client that is built from it.
#[derive(Clone)]
pub struct HubConfig {
    /// Hub address, `host` or `host:port`.
    pub endpoint: String,
    pub secret_provider: Arc<dyn SecretProvider>,
    /// Time between two snapshot fetches.
    pub refresh_interval: Duration,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Retry behaviour for write requests.
    pub retry: RetryPolicy,
}

impl HubConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret_provider: Arc::new(StaticSecret::none()),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_secret(mut self, secret: SecretString) -> Self {
        self.secret_provider = Arc::new(StaticSecret::new(Some(secret)));
        self
    }

    pub fn with_secret_provider(mut self, provider: impl SecretProvider + 'static) -> Self {
        self.secret_provider = Arc::new(provider);
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubConfig")
            .field("endpoint", &self.endpoint)
            .field("refresh_interval", &self.refresh_interval)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[tokio::test]
    async fn static_secret_is_returned_every_time() {
        let provider = StaticSecret::new(Some(SecretString::from("abc".to_string())));
        for _ in 0..2 {
            let secret = provider.secret().await;
            assert_eq!(secret.as_ref().map(|s| s.expose_secret()), Some("abc"));
        }
    }

    #[tokio::test]
    async fn closure_provider_is_called_per_request() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = SecretFn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { None::<SecretString> }
        });

        assert!(provider.secret().await.is_none());
        assert!(provider.secret().await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn defaults_poll_every_five_seconds() {
        let config = HubConfig::new("hub.local");
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
        assert!(format!("{config:?}").contains("hub.local"));
    }
}
