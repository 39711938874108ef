// ── Command dispatch ──
//
// PATCH writes against `/data/v2/domain/{tag}/{id}/{segment}`. Writes
// never touch the snapshot cache: the next poll tick reflects them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

use wiser_api::{HubClient, RequestType};

use crate::config::SecretProvider;
use crate::error::CoreError;

// ── RetryPolicy ──────────────────────────────────────────────────────

/// Fixed-delay retry for write requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between two attempts. Default: 1s.
    pub delay: Duration,

    /// Maximum number of attempts, the first one included.
    /// `None` means retry forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn never() -> Self {
        Self {
            delay: Duration::ZERO,
            max_attempts: Some(1),
        }
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

// ── Commands ─────────────────────────────────────────────────────────

/// One write aimed at a family record.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub tag: String,
    pub id: u64,
    pub request_type: RequestType,
    pub body: Value,
}

impl Command {
    pub fn action(tag: impl Into<String>, id: u64, body: Value) -> Self {
        Self {
            tag: tag.into(),
            id,
            request_type: RequestType::Action,
            body,
        }
    }

    pub fn override_state(tag: impl Into<String>, id: u64, body: Value) -> Self {
        Self {
            tag: tag.into(),
            id,
            request_type: RequestType::Override,
            body,
        }
    }
}

// ── In-flight tracking ───────────────────────────────────────────────

/// Target of a write: one request type on one family record.
type TargetKey = (String, u64, RequestType);

/// Background sends still running, at most one per target.
#[derive(Default)]
struct InFlight {
    next_generation: u64,
    tasks: HashMap<TargetKey, (u64, AbortHandle)>,
}

// ── CommandDispatcher ────────────────────────────────────────────────

/// Sends [`Command`]s with the configured retry policy.
#[derive(Clone)]
pub struct CommandDispatcher {
    client: HubClient,
    secrets: Arc<dyn SecretProvider>,
    retry: RetryPolicy,
    in_flight: Arc<Mutex<InFlight>>,
}

impl CommandDispatcher {
    pub fn new(client: HubClient, secrets: Arc<dyn SecretProvider>, retry: RetryPolicy) -> Self {
        Self {
            client,
            secrets,
            retry,
            in_flight: Arc::default(),
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, InFlight> {
        // Only plain map updates happen under the lock.
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Send a command and wait for the final outcome.
    ///
    /// Transient failures are retried after `retry.delay`; any other error
    /// (or running out of attempts) is returned as is. The secret is
    /// fetched again before every attempt.
    pub async fn send(&self, command: &Command) -> Result<(), CoreError> {
        // Rejected before the first request goes out.
        self.client.registry().get(&command.tag)?;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let secret = self.secrets.secret().await;
            let result = self
                .client
                .request(
                    &command.tag,
                    command.id,
                    command.request_type,
                    &command.body,
                    secret.as_ref(),
                )
                .await
                .map_err(CoreError::from);

            match result {
                Ok(()) => {
                    debug!(tag = %command.tag, id = command.id, attempt, "command accepted");
                    return Ok(());
                }
                Err(e) if e.is_transient() && !self.retry.exhausted(attempt) => {
                    warn!(
                        error = %e,
                        tag = %command.tag,
                        id = command.id,
                        attempt,
                        delay_ms = u64::try_from(self.retry.delay.as_millis()).unwrap_or(u64::MAX),
                        "command failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fire-and-forget: run [`send`](Self::send) on a background task.
    ///
    /// A newer dispatch for the same tag, id and request type aborts the
    /// older one, so a retrying stale write can never land after it. The
    /// final failure is logged. The handle may be dropped.
    pub fn dispatch(&self, command: Command) -> JoinHandle<()> {
        let key: TargetKey = (command.tag.clone(), command.id, command.request_type);
        let mut in_flight = self.in_flight();
        in_flight.next_generation += 1;
        let generation = in_flight.next_generation;

        let dispatcher = self.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = dispatcher.send(&command).await {
                warn!(
                    error = %e,
                    tag = %command.tag,
                    id = command.id,
                    request = %command.request_type,
                    "command failed"
                );
            }
            let mut in_flight = dispatcher.in_flight();
            if in_flight
                .tasks
                .get(&task_key)
                .is_some_and(|(g, _)| *g == generation)
            {
                in_flight.tasks.remove(&task_key);
            }
        });

        if let Some((_, previous)) = in_flight
            .tasks
            .insert(key, (generation, handle.abort_handle()))
        {
            debug!(generation, "superseding in-flight command");
            previous.abort();
        }
        handle
    }

    /// Number of background sends still running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight().tasks.len()
    }
}
