//! Ordered callback registry with panic isolation.
//!
//! Several services keep lists of subscriber callbacks: the connection
//! manager forwards raw hub messages, the dispatch coordinator forwards
//! de-duplicated notifications, and the preference store announces changed
//! preference records. All of them share this registry so the rules are the
//! same everywhere: callbacks run synchronously in registration order, and a
//! panicking callback never takes down its neighbours or the emitting
//! service.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Opaque handle identifying a registered listener.
///
/// Returned by [`ListenerRegistry::add`] and consumed by
/// [`ListenerRegistry::remove`]. Ids are unique per registry for the lifetime
/// of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A synchronous, ordered list of callbacks over values of type `T`.
pub struct ListenerRegistry<T> {
    next_id: AtomicU64,
    entries: RwLock<Vec<(ListenerId, Arc<dyn Fn(&T) + Send + Sync>)>>,
    /// Component name used as the log prefix when a listener panics.
    label: &'static str,
}

impl<T> ListenerRegistry<T> {
    /// Creates an empty registry. `label` appears in log lines.
    pub fn new(label: &'static str) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: RwLock::new(Vec::new()),
            label,
        }
    }

    /// Registers a callback and returns its handle.
    pub fn add(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, Arc::new(listener)));
        id
    }

    /// Removes a previously registered callback.
    ///
    /// Returns `true` if the handle was found, `false` if it was unknown or
    /// already removed.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry has no callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Invokes every callback with `value`, in registration order.
    ///
    /// Callbacks run on the caller's thread. A panic inside one callback is
    /// caught and logged; remaining callbacks still run.
    pub fn emit(&self, value: &T) {
        // Snapshot the callbacks so a listener that (un)subscribes from
        // inside its own callback cannot deadlock on the registry lock.
        let snapshot: Vec<Arc<dyn Fn(&T) + Send + Sync>> = self
            .entries
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
                log::error!(
                    "[{}] Listener panicked; continuing with remaining listeners",
                    self.label
                );
            }
        }
    }
}

impl<T> std::fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("label", &self.label)
            .field("len", &self.len())
            .finish()
    }
}
