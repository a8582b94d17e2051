//! Single-slot overwrite channel connecting pipeline stages.
//!
//! Every stage boundary in the pipeline is one of these: the producer
//! overwrites the slot with a full snapshot, the consumer reads the latest
//! snapshot without blocking and can wait for the next publish with a
//! bounded timeout. Old values are dropped, never queued; a slow consumer
//! sees the freshest data rather than a backlog.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

struct Slot<T> {
    value: T,
    fresh: bool,
}

struct ChannelInner<T> {
    slot: Mutex<Slot<T>>,
    cond: Condvar,
}

/// A cloneable handle to a single-slot latest-value channel.
///
/// `read` is safe from any number of threads and always yields a complete
/// snapshot: the slot is mutex-guarded, so a read concurrent with a publish
/// returns entirely the old or entirely the new value, never a mixture.
/// The update signal consumed by [`StateChannel::wait_timeout`] is a
/// single-waiter signal; the pipeline attaches exactly one waiting consumer
/// per channel.
pub struct StateChannel<T> {
    inner: Arc<ChannelInner<T>>,
}

impl<T> Clone for StateChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Default> Default for StateChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Default> StateChannel<T> {
    /// Create a channel holding `T::default()` with no update pending.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                slot: Mutex::new(Slot {
                    value: T::default(),
                    fresh: false,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    /// Overwrite the slot with a full snapshot and wake any waiter.
    pub fn publish(&self, value: T) {
        let mut slot = self.lock_slot();
        slot.value = value;
        slot.fresh = true;
        self.inner.cond.notify_all();
    }

    /// Clone of the last published snapshot; `T::default()` before the
    /// first publish. Never blocks beyond the slot lock.
    #[must_use]
    pub fn read(&self) -> T {
        self.lock_slot().value.clone()
    }

    /// Block until a new publish occurs or `timeout` elapses.
    ///
    /// Returns whether new data arrived, consuming the update signal. A
    /// publish that happened since the last consumed signal satisfies the
    /// wait immediately. A `read` performed after this returns `true`
    /// observes the triggering publish's value or a newer one.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let slot = self.lock_slot();
        let (mut slot, _timed_out) = match self
            .inner
            .cond
            .wait_timeout_while(slot, timeout, |s| !s.fresh)
        {
            Ok(pair) => pair,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.fresh {
            slot.fresh = false;
            true
        } else {
            false
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot<T>> {
        // A poisoned slot still holds a complete snapshot; keep serving it
        match self.inner.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
