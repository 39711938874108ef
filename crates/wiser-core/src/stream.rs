// ── Reactive snapshot streams ──
//
// Consumers follow the polling cache through these types instead of
// touching the watch channel directly.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use wiser_api::HubSnapshot;

use crate::device::DomainDevice;

/// `Stream` of hub snapshots backed by the cache's watch channel.
///
/// Yields the current snapshot first (once one exists), then each newer
/// one. Intermediate snapshots may be skipped by a slow consumer, never
/// reordered.
pub struct SnapshotStream {
    inner: WatchStream<Option<Arc<HubSnapshot>>>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Option<Arc<HubSnapshot>>>) -> Self {
        Self {
            inner: WatchStream::new(receiver),
        }
    }
}

impl Stream for SnapshotStream {
    type Item = Arc<HubSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Some(snapshot))) => return Poll::Ready(Some(snapshot)),
                // Nothing fetched yet.
                Poll::Ready(Some(None)) => {}
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

// ── DeviceBinding ────────────────────────────────────────────────────

/// Keeps a domain device in sync with the snapshot stream.
///
/// The background task stops when the binding is dropped or cancelled.
pub struct DeviceBinding {
    device: DomainDevice,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl DeviceBinding {
    pub(crate) fn spawn(
        runtime: &Handle,
        mut stream: SnapshotStream,
        device: DomainDevice,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let follower = device.clone();

        let handle = runtime.spawn(async move {
            let tag = follower.tag();
            let id = follower.identity().id;
            debug!(%tag, id, "device binding started");

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    next = stream.next() => {
                        let Some(snapshot) = next else { break };
                        if !follower.apply_snapshot(&snapshot) {
                            trace!(%tag, id, "no matching record in snapshot");
                        }
                    }
                }
            }

            debug!(%tag, id, "device binding stopped");
        });

        Self {
            device,
            cancel,
            handle,
        }
    }

    pub fn device(&self) -> &DomainDevice {
        &self.device
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop following the stream.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for DeviceBinding {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
