// ── Client facade ──
//
// `WiserClient` ties the polling cache, the family registry and the
// command dispatcher together behind one cheaply cloneable handle.

use std::sync::{Arc, OnceLock};

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use wiser_api::{
    DeviceRecord, DeviceRegistry, Family, HubClient, HubSnapshot, TransportConfig, WiserRecord,
};

use crate::cache::{FetchSnapshot, HubFetcher, SharedPollingCache, current_runtime};
use crate::command::{Command, CommandDispatcher};
use crate::config::HubConfig;
use crate::device::DomainDevice;
use crate::error::CoreError;
use crate::stream::{DeviceBinding, SnapshotStream};

// ── WiserClient ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ClientInner>`. Construction does no I/O;
/// the poll loop starts on the first call that needs hub data.
#[derive(Clone)]
pub struct WiserClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: HubConfig,
    registry: Arc<DeviceRegistry>,
    cache: SharedPollingCache,
    dispatcher: CommandDispatcher,
}

impl WiserClient {
    /// Build a client from configuration.
    pub fn new(config: HubConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        };
        let http = HubClient::new(&config.endpoint, &transport)?;
        Ok(Self::with_hub_client(config, http))
    }

    /// Build a client around an existing [`HubClient`].
    pub fn with_hub_client(config: HubConfig, http: HubClient) -> Self {
        let fetcher = Arc::new(HubFetcher::new(
            http.clone(),
            Arc::clone(&config.secret_provider),
        ));
        Self::with_fetcher(config, http, fetcher)
    }

    /// Build a client whose snapshots come from `fetcher`. Writes still
    /// go through `http`.
    pub fn with_fetcher(config: HubConfig, http: HubClient, fetcher: Arc<dyn FetchSnapshot>) -> Self {
        let registry = Arc::new(http.registry().clone());
        let cache = SharedPollingCache::new(fetcher, config.refresh_interval);
        let dispatcher = CommandDispatcher::new(
            http,
            Arc::clone(&config.secret_provider),
            config.retry.clone(),
        );

        debug!(endpoint = %config.endpoint, "wiser client created");

        Self {
            inner: Arc::new(ClientInner {
                config,
                registry,
                cache,
                dispatcher,
            }),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.inner.registry
    }

    pub fn cache(&self) -> &SharedPollingCache {
        &self.inner.cache
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Latest snapshot, fetching the first one if needed.
    pub async fn get_hub_snapshot(&self) -> Result<Arc<HubSnapshot>, CoreError> {
        self.inner.cache.get_hub_snapshot().await
    }

    /// Look up a family record by tag and id.
    ///
    /// `id` is the decimal id as it appears in command paths; anything
    /// that is not an integer cannot match and yields `NotFound`.
    pub async fn get_device(&self, tag: &str, id: &str) -> Result<WiserRecord, CoreError> {
        let entry = *self.inner.registry.get(tag)?;
        let snapshot = self.get_hub_snapshot().await?;

        id.trim()
            .parse::<u64>()
            .ok()
            .and_then(|numeric| entry.find(&snapshot, numeric))
            .ok_or_else(|| CoreError::not_found(tag, id))
    }

    /// Typed lookup for a family known at compile time.
    pub async fn get_family<F: Family>(&self, id: u64) -> Result<F, CoreError> {
        let snapshot = self.get_hub_snapshot().await?;
        F::records(&snapshot)
            .iter()
            .find(|record| record.base().id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(F::TAG, id))
    }

    /// Stream of snapshots; see [`SharedPollingCache::subscribe`].
    pub fn subscribe(&self) -> Result<SnapshotStream, CoreError> {
        self.inner.cache.subscribe()
    }

    /// Keep `device` updated from every new snapshot until the returned
    /// binding is dropped.
    pub fn bind(&self, device: impl Into<DomainDevice>) -> Result<DeviceBinding, CoreError> {
        let runtime = current_runtime()?;
        Ok(DeviceBinding::spawn(&runtime, self.subscribe()?, device.into()))
    }

    /// Every hub device backed by a supported family record.
    pub async fn discover(&self) -> Result<Vec<Accessory>, CoreError> {
        let snapshot = self.get_hub_snapshot().await?;
        let accessories: Vec<Accessory> = snapshot
            .devices
            .iter()
            .filter_map(|device| {
                self.inner.registry.family_for_product(&device.product_type)?;
                let record = snapshot.wiser_device_for(device)?;
                Some(Accessory {
                    device: device.clone(),
                    kind: record.tag(),
                    record,
                })
            })
            .collect();

        info!(
            devices = snapshot.devices.len(),
            accessories = accessories.len(),
            "discovery complete"
        );
        Ok(accessories)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Fire-and-forget `RequestAction`. Failures are retried, then logged.
    /// A newer request for the same record replaces one still retrying.
    pub fn request_action(&self, tag: &str, id: u64, body: Value) -> JoinHandle<()> {
        self.inner.dispatcher.dispatch(Command::action(tag, id, body))
    }

    /// Fire-and-forget `RequestOverride`. Failures are retried, then logged.
    /// A newer request for the same record replaces one still retrying.
    pub fn request_override(&self, tag: &str, id: u64, body: Value) -> JoinHandle<()> {
        self.inner.dispatcher.dispatch(Command::override_state(tag, id, body))
    }

    /// `RequestAction`, waiting for the final outcome.
    pub async fn send_action(&self, tag: &str, id: u64, body: Value) -> Result<(), CoreError> {
        self.send(Command::action(tag, id, body)).await
    }

    /// `RequestOverride`, waiting for the final outcome.
    pub async fn send_override(&self, tag: &str, id: u64, body: Value) -> Result<(), CoreError> {
        self.send(Command::override_state(tag, id, body)).await
    }

    /// Send any [`Command`], waiting for the final outcome.
    pub async fn send(&self, command: Command) -> Result<(), CoreError> {
        self.inner.dispatcher.send(&command).await
    }

    /// Send any [`Command`] in the background.
    pub fn dispatch(&self, command: Command) -> JoinHandle<()> {
        self.inner.dispatcher.dispatch(command)
    }

    /// Background writes that have not finished yet.
    pub fn in_flight_commands(&self) -> usize {
        self.inner.dispatcher.in_flight_count()
    }

    /// Stop background polling.
    pub fn shutdown(&self) {
        self.inner.cache.shutdown();
    }
}

// ── Accessory ────────────────────────────────────────────────────────

/// A hub device paired with its family record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accessory {
    pub device: DeviceRecord,
    /// Family tag of `record`.
    pub kind: &'static str,
    pub record: WiserRecord,
}

impl Accessory {
    /// Stable seed for an accessory identifier: the serial number, or the
    /// hub device id when the hub reports none.
    pub fn uuid_seed(&self) -> String {
        self.device
            .serial_number
            .clone()
            .unwrap_or_else(|| self.device.id.to_string())
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    /// A fresh domain device built from the discovered record.
    pub fn domain_device(&self) -> DomainDevice {
        DomainDevice::from_record(&self.record)
    }
}

// ── Process-wide instance ────────────────────────────────────────────

/// A holder that can be set exactly once.
#[derive(Default)]
pub struct ClientSlot {
    client: OnceLock<WiserClient>,
}

impl ClientSlot {
    pub const fn new() -> Self {
        Self {
            client: OnceLock::new(),
        }
    }

    /// Build and store a client. A second call is rejected and the
    /// first client stays in place.
    pub fn init(&self, config: HubConfig) -> Result<WiserClient, CoreError> {
        if self.client.get().is_some() {
            return Err(already_initialized());
        }
        let client = WiserClient::new(config)?;
        self.set(client)
    }

    /// Store an already built client.
    pub fn set(&self, client: WiserClient) -> Result<WiserClient, CoreError> {
        self.client
            .set(client.clone())
            .map_err(|_| already_initialized())?;
        info!(endpoint = %client.config().endpoint, "wiser client initialized");
        Ok(client)
    }

    pub fn get(&self) -> Result<WiserClient, CoreError> {
        self.client.get().cloned().ok_or_else(|| {
            CoreError::configuration("client not initialized; call init() first")
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.client.get().is_some()
    }
}

fn already_initialized() -> CoreError {
    CoreError::configuration("client already initialized")
}

static INSTANCE: ClientSlot = ClientSlot::new();

/// Initialize the process-wide client.
pub fn init(config: HubConfig) -> Result<WiserClient, CoreError> {
    INSTANCE.init(config)
}

/// The process-wide client set by [`init`].
pub fn instance() -> Result<WiserClient, CoreError> {
    INSTANCE.get()
}
