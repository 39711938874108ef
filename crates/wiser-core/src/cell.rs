// ── Replay-one state cell ──
//
// Holds the latest value of one device attribute. New subscribers are
// called right away with the current value, then on every `push`.
// Callbacks run synchronously on the pushing thread, outside the lock,
// so a subscriber may read or push the same cell again.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`StateCell::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observable value that always has a current value.
///
/// `push` notifies every subscriber, in subscription order, even when the
/// new value equals the old one.
pub struct StateCell<T> {
    inner: Mutex<Inner<T>>,
}

struct Inner<T> {
    value: T,
    subscribers: Vec<(SubscriptionId, Subscriber<T>)>,
    next_id: u64,
}

impl<T: Clone + Send + 'static> StateCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                value: initial,
                subscribers: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Store `value` and notify every subscriber.
    pub fn push(&self, value: T) {
        let subscribers: Vec<Subscriber<T>> = {
            let mut inner = self.lock();
            inner.value = value.clone();
            inner.subscribers.iter().map(|(_, f)| Arc::clone(f)).collect()
        };

        for subscriber in subscribers {
            subscriber(&value);
        }
    }

    /// Register `callback`; it is invoked once immediately with the
    /// current value.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Subscriber<T> = Arc::new(callback);
        let (id, current) = {
            let mut inner = self.lock();
            let id = SubscriptionId(inner.next_id);
            inner.next_id += 1;
            inner.subscribers.push((id, Arc::clone(&callback)));
            (id, inner.value.clone())
        };

        callback(&current);
        id
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // A panicking subscriber never holds the lock, so the data is intact.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Default + Send + 'static> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("StateCell")
            .field("value", &inner.value)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}
