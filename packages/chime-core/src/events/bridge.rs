//! Bridges domain events onto a tokio broadcast channel.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::events::{
    ActionEvent, ChimeEvent, ConnectionEvent, EventEmitter, NotificationEvent, ToastEvent,
};

/// Fans domain events out to broadcast subscribers, optionally forwarding to
/// an external emitter first.
///
/// Services emit through the [`EventEmitter`] trait; shells subscribe to the
/// broadcast side with [`BroadcastEventBridge::subscribe`]. An embedding host
/// (for example a webview glue layer) can additionally register its own
/// emitter with [`set_external_emitter`], which sees every event before it is
/// broadcast.
///
/// [`set_external_emitter`]: BroadcastEventBridge::set_external_emitter
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<ChimeEvent>,
    external_emitter: Arc<RwLock<Option<Arc<dyn EventEmitter>>>>,
}

impl BroadcastEventBridge {
    /// Creates a bridge with its own broadcast channel of the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self::with_sender(tx)
    }

    /// Creates a bridge over an existing broadcast sender.
    #[must_use]
    pub fn with_sender(tx: broadcast::Sender<ChimeEvent>) -> Self {
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Registers an external emitter that receives every event before it is
    /// broadcast. Passing a new emitter replaces the previous one.
    pub fn set_external_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }

    /// Subscribes to the broadcast side of the bridge.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChimeEvent> {
        self.tx.subscribe()
    }

    /// Returns a clone of the underlying broadcast sender.
    #[must_use]
    pub fn sender(&self) -> broadcast::Sender<ChimeEvent> {
        self.tx.clone()
    }

    fn forward(&self, event: ChimeEvent) {
        if let Err(e) = self.tx.send(event) {
            // Not an error: there simply is no UI subscribed right now.
            log::trace!("[EventBridge] No broadcast receivers: {}", e);
        }
    }
}

macro_rules! impl_emit {
    ($method:ident, $event_ty:ty) => {
        fn $method(&self, event: $event_ty) {
            let external = self.external_emitter.read().clone();
            if let Some(emitter) = external {
                emitter.$method(event.clone());
            }
            self.forward(event.into());
        }
    };
}

impl EventEmitter for BroadcastEventBridge {
    impl_emit!(emit_connection, ConnectionEvent);
    impl_emit!(emit_notification, NotificationEvent);
    impl_emit!(emit_toast, ToastEvent);
    impl_emit!(emit_action, ActionEvent);
}

impl std::fmt::Debug for BroadcastEventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastEventBridge")
            .field("receiver_count", &self.tx.receiver_count())
            .field("has_external", &self.external_emitter.read().is_some())
            .finish()
    }
}
