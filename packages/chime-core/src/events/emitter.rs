//! Event emitter abstraction for decoupling services from the UI layer.

use crate::events::{ActionEvent, ConnectionEvent, NotificationEvent, ToastEvent};

/// Trait for emitting domain events to interested parties.
///
/// Domain services hold an `Arc<dyn EventEmitter>` and stay agnostic of who
/// is listening. The bootstrap layer wires in a [`BroadcastEventBridge`] that
/// forwards to UI subscribers; tests substitute recording emitters.
///
/// [`BroadcastEventBridge`]: crate::events::BroadcastEventBridge
pub trait EventEmitter: Send + Sync {
    /// Emits a connection lifecycle event.
    fn emit_connection(&self, event: ConnectionEvent);

    /// Emits a delivered-notification event.
    fn emit_notification(&self, event: NotificationEvent);

    /// Emits a toast lifecycle event.
    fn emit_toast(&self, event: ToastEvent);

    /// Emits a user-action event.
    fn emit_action(&self, event: ActionEvent);
}

/// An event emitter that discards all events.
///
/// Useful for tests or headless embedding where nothing subscribes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_connection(&self, _event: ConnectionEvent) {
        // No-op
    }

    fn emit_notification(&self, _event: NotificationEvent) {
        // No-op
    }

    fn emit_toast(&self, _event: ToastEvent) {
        // No-op
    }

    fn emit_action(&self, _event: ActionEvent) {
        // No-op
    }
}

/// An event emitter that logs all events via `tracing`.
///
/// Handy when debugging event flow without a UI attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_connection(&self, event: ConnectionEvent) {
        tracing::debug!(?event, "connection_event");
    }

    fn emit_notification(&self, event: NotificationEvent) {
        tracing::debug!(?event, "notification_event");
    }

    fn emit_toast(&self, event: ToastEvent) {
        tracing::debug!(?event, "toast_event");
    }

    fn emit_action(&self, event: ActionEvent) {
        tracing::debug!(?event, "action_event");
    }
}
