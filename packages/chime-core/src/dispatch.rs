//! De-duplicating notification dispatch.
//!
//! The hub delivers at-least-once: overlapping group memberships and
//! reconnect races both produce repeats. [`DispatchCoordinator`] sits
//! between the raw connection stream and delivery listeners, fingerprints
//! every notification, and forwards each fingerprint at most once while it
//! remains within a fixed-size recency horizon.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::connection::{ConnectionManager, InboundMessage};
use crate::constants::DEDUP_CACHE_CAPACITY;
use crate::events::{EventEmitter, ListenerId, ListenerRegistry, NotificationEvent};

/// Identity of a notification for duplicate suppression.
///
/// Three components joined with `|`: the event type, the payload's `id`
/// field, and the publisher timestamp. The `id` is read from `data.id` when
/// it is a JSON number or string and is empty otherwise, so payloads without
/// an id still dedup on type and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageFingerprint(String);

impl MessageFingerprint {
    /// Computes the fingerprint of a message.
    #[must_use]
    pub fn of(message: &InboundMessage) -> Self {
        let payload_id = match message.data.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        Self(format!(
            "{}|{}|{}",
            message.event_type, payload_id, message.timestamp
        ))
    }

    /// The joined fingerprint text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fixed-capacity FIFO of recently seen fingerprints.
///
/// Eviction is strictly by insertion age; a duplicate does not refresh its
/// entry's position. Once a fingerprint ages out, the same notification
/// would be forwarded again, which is the accepted trade-off for a bounded
/// cache.
#[derive(Debug)]
pub struct DedupCache {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl DedupCache {
    /// Creates a cache remembering the last `capacity` fingerprints.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity + 1),
            seen: HashSet::with_capacity(capacity + 1),
        }
    }

    /// Records a fingerprint.
    ///
    /// Returns `true` if it was new (deliver), `false` if it was already
    /// within the horizon (suppress). Inserts before evicting, so the oldest
    /// entry leaves only when a new one pushes the cache past capacity.
    pub fn observe(&mut self, fingerprint: &MessageFingerprint) -> bool {
        if self.seen.contains(fingerprint.as_str()) {
            return false;
        }
        self.order.push_back(fingerprint.as_str().to_string());
        self.seen.insert(fingerprint.as_str().to_string());
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }

    /// Whether the fingerprint is currently within the horizon.
    #[must_use]
    pub fn contains(&self, fingerprint: &MessageFingerprint) -> bool {
        self.seen.contains(fingerprint.as_str())
    }

    /// Number of fingerprints currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Counters over the dispatcher's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Notifications forwarded to listeners.
    pub forwarded: u64,
    /// Duplicates suppressed.
    pub suppressed: u64,
}

struct DispatchInner {
    cache: Mutex<DedupCache>,
    listeners: ListenerRegistry<InboundMessage>,
    emitter: Arc<dyn EventEmitter>,
    forwarded: AtomicU64,
    suppressed: AtomicU64,
}

impl DispatchInner {
    fn ingest(&self, message: &InboundMessage) {
        let fingerprint = MessageFingerprint::of(message);
        let fresh = self.cache.lock().observe(&fingerprint);
        if !fresh {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            log::trace!("[Dispatch] Suppressed duplicate '{}'", fingerprint.as_str());
            return;
        }
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        self.listeners.emit(message);
        self.emitter.emit_notification(NotificationEvent::Delivered {
            notification_type: message.event_type.clone(),
            data: message.data.clone(),
            timestamp: message.timestamp.clone(),
        });
    }
}

/// Subscribes to the raw connection stream and forwards de-duplicated
/// notifications to its own listeners.
///
/// Detaches from the connection when dropped.
pub struct DispatchCoordinator {
    inner: Arc<DispatchInner>,
    connection: Arc<ConnectionManager>,
    raw_listener: ListenerId,
}

impl DispatchCoordinator {
    /// Attaches a coordinator to `connection`.
    pub fn attach(connection: Arc<ConnectionManager>, emitter: Arc<dyn EventEmitter>) -> Self {
        let inner = Arc::new(DispatchInner {
            cache: Mutex::new(DedupCache::new(DEDUP_CACHE_CAPACITY)),
            listeners: ListenerRegistry::new("Dispatch"),
            emitter,
            forwarded: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
        });
        let listener_inner = Arc::clone(&inner);
        let raw_listener = connection.add_listener(move |message| listener_inner.ingest(message));
        Self {
            inner,
            connection,
            raw_listener,
        }
    }

    /// Registers a callback for de-duplicated notifications.
    pub fn add_listener(
        &self,
        listener: impl Fn(&InboundMessage) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    /// Removes a delivery listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Feeds a message through dedup directly, bypassing the connection.
    /// Used by shells that replay missed notifications from a REST backlog.
    pub fn ingest(&self, message: &InboundMessage) {
        self.inner.ingest(message);
    }

    /// Lifetime forwarded/suppressed counters.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            forwarded: self.inner.forwarded.load(Ordering::Relaxed),
            suppressed: self.inner.suppressed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for DispatchCoordinator {
    fn drop(&mut self) {
        self.connection.remove_listener(self.raw_listener);
    }
}

impl std::fmt::Debug for DispatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCoordinator")
            .field("stats", &self.stats())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionManager, ConnectionOptions};
    use crate::events::NoopEventEmitter;
    use crate::runtime::TokioSpawner;
    use std::sync::atomic::AtomicUsize;

    fn message(event_type: &str, id: Option<Value>, timestamp: &str) -> InboundMessage {
        let data = match id {
            Some(id) => serde_json::json!({ "id": id, "extra": "ignored" }),
            None => serde_json::json!({ "extra": "ignored" }),
        };
        InboundMessage {
            event_type: event_type.to_string(),
            data,
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn fingerprint_reads_numeric_and_string_ids() {
        let numeric = message("appointment_created", Some(42.into()), "t1");
        assert_eq!(
            MessageFingerprint::of(&numeric).as_str(),
            "appointment_created|42|t1"
        );

        let string = message("appointment_created", Some("abc".into()), "t1");
        assert_eq!(
            MessageFingerprint::of(&string).as_str(),
            "appointment_created|abc|t1"
        );
    }

    #[test]
    fn fingerprint_tolerates_missing_and_odd_ids() {
        let missing = message("note", None, "t1");
        assert_eq!(MessageFingerprint::of(&missing).as_str(), "note||t1");

        let object_id = message("note", Some(serde_json::json!({ "nested": 1 })), "t1");
        assert_eq!(MessageFingerprint::of(&object_id).as_str(), "note||t1");
    }

    #[test]
    fn cache_suppresses_within_horizon() {
        let mut cache = DedupCache::new(3);
        let fp = MessageFingerprint::of(&message("note", Some(1.into()), "t1"));

        assert!(cache.observe(&fp));
        assert!(!cache.observe(&fp));
        assert!(!cache.observe(&fp));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_evicts_oldest_first_and_refires_beyond_horizon() {
        let mut cache = DedupCache::new(100);
        let fingerprints: Vec<_> = (0..150)
            .map(|n| MessageFingerprint::of(&message("note", Some(n.into()), "t")))
            .collect();

        for fp in &fingerprints {
            assert!(cache.observe(fp));
        }
        assert_eq!(cache.len(), 100, "bounded at capacity");

        // 0..50 aged out, 50..150 still inside.
        assert!(!cache.contains(&fingerprints[0]));
        assert!(cache.contains(&fingerprints[50]));
        assert!(cache.contains(&fingerprints[149]));

        // An aged-out fingerprint is new again.
        assert!(cache.observe(&fingerprints[0]));
    }

    #[test]
    fn duplicate_does_not_refresh_eviction_order() {
        let mut cache = DedupCache::new(2);
        let a = MessageFingerprint::of(&message("note", Some("a".into()), "t"));
        let b = MessageFingerprint::of(&message("note", Some("b".into()), "t"));
        let c = MessageFingerprint::of(&message("note", Some("c".into()), "t"));

        assert!(cache.observe(&a));
        assert!(cache.observe(&b));
        assert!(!cache.observe(&a), "duplicate suppressed");
        // a is still the oldest; c pushes it out.
        assert!(cache.observe(&c));
        assert!(!cache.contains(&a));
        assert!(cache.contains(&b));
    }

    async fn test_coordinator() -> DispatchCoordinator {
        let connection = Arc::new(
            ConnectionManager::new(
                "http://localhost:5000/api/v1",
                ConnectionOptions::default(),
                Arc::new(NoopEventEmitter),
                TokioSpawner::current(),
            )
            .expect("valid endpoint"),
        );
        DispatchCoordinator::attach(connection, Arc::new(NoopEventEmitter))
    }

    #[tokio::test]
    async fn coordinator_forwards_once_and_counts() {
        let coordinator = test_coordinator().await;
        let delivered = Arc::new(AtomicUsize::new(0));

        let delivered_clone = Arc::clone(&delivered);
        coordinator.add_listener(move |_| {
            delivered_clone.fetch_add(1, Ordering::SeqCst);
        });

        let first = message("appointment_created", Some(7.into()), "t1");
        coordinator.ingest(&first);
        coordinator.ingest(&first);
        coordinator.ingest(&message("appointment_created", Some(7.into()), "t2"));

        assert_eq!(delivered.load(Ordering::SeqCst), 2);
        assert_eq!(
            coordinator.stats(),
            DispatchStats {
                forwarded: 2,
                suppressed: 1
            }
        );
    }

    #[tokio::test]
    async fn panicking_delivery_listener_is_isolated() {
        let coordinator = test_coordinator().await;
        let survivors = Arc::new(AtomicUsize::new(0));

        coordinator.add_listener(|_| panic!("listener exploded"));
        let survivors_clone = Arc::clone(&survivors);
        coordinator.add_listener(move |_| {
            survivors_clone.fetch_add(1, Ordering::SeqCst);
        });

        coordinator.ingest(&message("note", Some(1.into()), "t1"));
        assert_eq!(survivors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_coordinator_detaches_from_connection() {
        let connection = Arc::new(
            ConnectionManager::new(
                "http://localhost:5000/api/v1",
                ConnectionOptions::default(),
                Arc::new(NoopEventEmitter),
                TokioSpawner::current(),
            )
            .expect("valid endpoint"),
        );

        let coordinator =
            DispatchCoordinator::attach(Arc::clone(&connection), Arc::new(NoopEventEmitter));
        let raw_listener = coordinator.raw_listener;
        drop(coordinator);

        assert!(
            !connection.remove_listener(raw_listener),
            "listener already removed by drop"
        );
    }
}
