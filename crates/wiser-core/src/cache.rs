// ── Shared polling cache ──
//
// One background loop per cache polls the hub and republishes the latest
// snapshot to every consumer. The loop starts on first demand and then
// runs for the life of the cache. Each tick preempts the previous tick's
// fetch; a fetch only publishes if its tick is newer than the last one
// published, so consumers never go back in time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wiser_api::{HubClient, HubSnapshot};

use crate::config::SecretProvider;
use crate::error::CoreError;
use crate::stream::SnapshotStream;

// ── Fetch seam ───────────────────────────────────────────────────────

/// Something that can produce one full hub snapshot.
pub trait FetchSnapshot: Send + Sync + 'static {
    fn fetch(&self) -> BoxFuture<'_, Result<HubSnapshot, CoreError>>;
}

/// Fetches snapshots over HTTP, asking for the secret before each request.
pub struct HubFetcher {
    client: HubClient,
    secrets: Arc<dyn SecretProvider>,
}

impl HubFetcher {
    pub fn new(client: HubClient, secrets: Arc<dyn SecretProvider>) -> Self {
        Self { client, secrets }
    }
}

impl FetchSnapshot for HubFetcher {
    fn fetch(&self) -> BoxFuture<'_, Result<HubSnapshot, CoreError>> {
        Box::pin(async move {
            let secret = self.secrets.secret().await;
            Ok(self.client.fetch_snapshot(secret.as_ref()).await?)
        })
    }
}

// ── Published state ──────────────────────────────────────────────────

/// Result of one poll tick.
#[derive(Debug, Clone)]
struct Outcome {
    tick: u64,
    result: Result<Arc<HubSnapshot>, CoreError>,
}

/// State shared between the cache handles and the poll loop.
struct Shared {
    fetcher: Arc<dyn FetchSnapshot>,
    /// Last tick whose outcome was published.
    last_tick: Mutex<u64>,
    snapshot_tx: watch::Sender<Option<Arc<HubSnapshot>>>,
    outcome_tx: watch::Sender<Option<Outcome>>,
}

impl Shared {
    fn publish(&self, tick: u64, result: Result<HubSnapshot, CoreError>) {
        let mut last = self.last_tick.lock().unwrap_or_else(PoisonError::into_inner);
        if *last >= tick {
            debug!(tick, last = *last, "discarding stale snapshot");
            return;
        }
        *last = tick;

        let result = result.map(Arc::new);
        match &result {
            Ok(snapshot) => {
                debug!(
                    tick,
                    devices = snapshot.devices.len(),
                    lights = snapshot.lights.len(),
                    shutters = snapshot.shutters.len(),
                    "snapshot refreshed"
                );
                self.snapshot_tx.send_replace(Some(Arc::clone(snapshot)));
            }
            Err(e) => warn!(error = %e, tick, "snapshot fetch failed"),
        }
        self.outcome_tx.send_replace(Some(Outcome { tick, result }));
    }
}

// ── SharedPollingCache ───────────────────────────────────────────────

/// Single-flight, replay-one cache of the hub snapshot.
///
/// Cheaply cloneable; all clones share one poll loop. Dropping the last
/// clone stops the loop.
#[derive(Clone)]
pub struct SharedPollingCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    shared: Arc<Shared>,
    interval: Duration,
    started: AtomicBool,
    cancel: CancellationToken,
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl SharedPollingCache {
    /// Create an idle cache. Nothing is fetched until the first call that
    /// needs hub data.
    pub fn new(fetcher: Arc<dyn FetchSnapshot>, interval: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (outcome_tx, _) = watch::channel(None);

        Self {
            inner: Arc::new(CacheInner {
                shared: Arc::new(Shared {
                    fetcher,
                    last_tick: Mutex::new(0),
                    snapshot_tx,
                    outcome_tx,
                }),
                interval,
                started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.interval
    }

    /// `true` once the poll loop has been spawned.
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// Latest successful snapshot, without waiting or starting the loop.
    pub fn latest(&self) -> Option<Arc<HubSnapshot>> {
        self.inner.shared.snapshot_tx.borrow().clone()
    }

    /// Spawn the poll loop unless it is already running.
    ///
    /// Fails without side effects when called outside a Tokio runtime.
    pub fn ensure_started(&self) -> Result<(), CoreError> {
        let runtime = current_runtime()?;
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(
            interval_ms = u64::try_from(self.inner.interval.as_millis()).unwrap_or(u64::MAX),
            "starting hub poll loop"
        );
        runtime.spawn(poll_loop(
            Arc::clone(&self.inner.shared),
            self.inner.interval,
            self.inner.cancel.clone(),
        ));
        Ok(())
    }

    /// Current snapshot, or the outcome of the next poll tick if nothing
    /// has been fetched successfully yet.
    pub async fn get_hub_snapshot(&self) -> Result<Arc<HubSnapshot>, CoreError> {
        if let Some(snapshot) = self.latest() {
            return Ok(snapshot);
        }

        let mut outcomes = self.inner.shared.outcome_tx.subscribe();
        self.ensure_started()?;

        // Published between the first check and `subscribe`.
        if let Some(snapshot) = self.latest() {
            return Ok(snapshot);
        }

        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => Err(shut_down()),
            changed = outcomes.changed() => {
                changed.map_err(|_| shut_down())?;
                let outcome = outcomes.borrow_and_update().clone();
                match outcome {
                    Some(Outcome { result, .. }) => result,
                    None => Err(CoreError::Internal("empty poll outcome".into())),
                }
            }
        }
    }

    /// Stream of snapshots: the current one right away (if any), then
    /// every newer one. Starts the poll loop, so a Tokio runtime must be
    /// running.
    pub fn subscribe(&self) -> Result<SnapshotStream, CoreError> {
        let receiver = self.inner.shared.snapshot_tx.subscribe();
        self.ensure_started()?;
        Ok(SnapshotStream::new(receiver))
    }

    /// Stop the poll loop. Pending and future `get_hub_snapshot` calls
    /// without a cached snapshot fail.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }
}

fn shut_down() -> CoreError {
    CoreError::Internal("snapshot cache shut down".into())
}

/// Handle to the runtime the caller is running on.
pub(crate) fn current_runtime() -> Result<Handle, CoreError> {
    Handle::try_current().map_err(|e| {
        CoreError::configuration(format!("background polling needs a Tokio runtime: {e}"))
    })
}

// ── Background poll loop ─────────────────────────────────────────────

/// Tick immediately, then every `interval`, until cancelled.
async fn poll_loop(shared: Arc<Shared>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut tick: u64 = 0;
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tick += 1;
                if let Some(previous) = in_flight.take() {
                    if !previous.is_finished() {
                        debug!(tick, "preempting unfinished fetch");
                    }
                    previous.abort();
                }

                let shared = Arc::clone(&shared);
                in_flight = Some(tokio::spawn(async move {
                    let result = shared.fetcher.fetch().await;
                    shared.publish(tick, result);
                }));
            }
        }
    }

    if let Some(handle) = in_flight {
        handle.abort();
    }
    debug!("hub poll loop exiting");
}
