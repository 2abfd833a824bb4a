// ── Observer registration ──
//
// Explicit register/unregister callback API with immediate synchronous
// fan-out. No buffering, no replay: an emission with zero registered
// observers is simply dropped. Backs the service update stream, per-model
// refresh signals, and session login/logout events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`ObserverSet::register`]; pass it back to
/// [`ObserverSet::unregister`] to stop observing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverHandle(u64);

/// A set of callbacks notified synchronously on every emission.
pub struct ObserverSet<T> {
    next_id: AtomicU64,
    observers: RwLock<Vec<(u64, Callback<T>)>>,
}

impl<T> ObserverSet<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register a callback; it fires on every subsequent emission until
    /// unregistered.
    pub fn register(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ObserverHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers
            .write()
            .expect("observer lock poisoned")
            .push((id, Arc::new(callback)));
        ObserverHandle(id)
    }

    /// Remove a previously registered callback. Unknown handles are a no-op.
    pub fn unregister(&self, handle: ObserverHandle) {
        self.observers
            .write()
            .expect("observer lock poisoned")
            .retain(|(id, _)| *id != handle.0);
    }

    /// Invoke every registered callback with `value`, in registration order.
    ///
    /// Callbacks run outside the internal lock, so they may freely
    /// register or unregister observers.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self
            .observers
            .read()
            .expect("observer lock poisoned")
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.read().expect("observer lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for ObserverSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
