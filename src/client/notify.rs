//! Change notification for cache and session updates.
//!
//! Subscribers are zero-argument callbacks run synchronously, in subscription
//! order, after every mutation. A panicking subscriber is caught and logged;
//! the rest still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::error;

type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Callback)>>,
}

#[derive(Clone, Default)]
pub struct NotificationBus {
    inner: Arc<Subscribers>,
}

/// Handle returned by [`NotificationBus::subscribe`].
#[must_use = "dropping the handle keeps the subscription; call `unsubscribe` to remove it"]
pub struct Subscription {
    id: u64,
    bus: Weak<Subscribers>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Calls every current subscriber. The list is snapshotted first, so
    /// callbacks may subscribe or unsubscribe freely.
    pub fn notify(&self) {
        let snapshot: Vec<(u64, Callback)> = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (id, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                error!(subscriber = id, "subscriber panicked during notification");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
