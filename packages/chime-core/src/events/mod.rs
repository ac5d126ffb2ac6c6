//! Event system for real-time UI communication.
//!
//! This module provides:
//! - [`EventEmitter`] trait for domain services to emit events
//! - [`BroadcastEventBridge`] for fan-out to UI subscribers
//! - [`ListenerRegistry`] for ordered, panic-isolated callback lists
//! - Event types for the various domains (connection, notifications, ...)
//!
//! The `ToastEvent` type is defined in [`crate::channels::toast`] and
//! re-exported here.

mod bridge;
mod emitter;
mod listeners;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};
pub use listeners::{ListenerId, ListenerRegistry};

// Re-export ToastEvent from channels::toast for convenience
pub use crate::channels::toast::ToastEvent;

use serde::Serialize;
use serde_json::Value;

use crate::connection::ConnectionState;

/// Events broadcast to UI subscribers.
///
/// This enum categorizes all real-time events shells can subscribe to. Each
/// category has its own inner event type with specific variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum ChimeEvent {
    /// Hub connection lifecycle events.
    Connection(ConnectionEvent),

    /// Delivered (de-duplicated) notifications.
    Notification(NotificationEvent),

    /// Toast queue lifecycle events.
    Toast(ToastEvent),

    /// Actions invoked from notification surfaces.
    Action(ActionEvent),
}

/// Events related to the hub connection lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConnectionEvent {
    /// The connection moved to a new state.
    StateChanged {
        /// State before the transition.
        previous: ConnectionState,
        /// State after the transition.
        current: ConnectionState,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Events for notifications that cleared duplicate suppression.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NotificationEvent {
    /// A notification was forwarded to delivery listeners.
    Delivered {
        /// Domain event name, e.g. `appointment_created`.
        #[serde(rename = "notificationType")]
        notification_type: String,
        /// Opaque payload as published by the backend.
        data: Value,
        /// Publisher timestamp (opaque string, not parsed).
        timestamp: String,
    },
}

/// Events for user actions on notification surfaces.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionEvent {
    /// The user activated a notification carrying an action.
    Invoked {
        /// Action identifier from the notification payload.
        action: String,
        /// Full payload of the originating notification.
        data: Value,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

// From implementations for converting inner events to ChimeEvent
impl From<ConnectionEvent> for ChimeEvent {
    fn from(event: ConnectionEvent) -> Self {
        ChimeEvent::Connection(event)
    }
}

impl From<NotificationEvent> for ChimeEvent {
    fn from(event: NotificationEvent) -> Self {
        ChimeEvent::Notification(event)
    }
}

impl From<ToastEvent> for ChimeEvent {
    fn from(event: ToastEvent) -> Self {
        ChimeEvent::Toast(event)
    }
}

impl From<ActionEvent> for ChimeEvent {
    fn from(event: ActionEvent) -> Self {
        ChimeEvent::Action(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_event_serializes_with_category_tag() {
        let event = ChimeEvent::from(ConnectionEvent::StateChanged {
            previous: ConnectionState::Disconnected,
            current: ConnectionState::Connecting,
            timestamp: 1_700_000_000_000,
        });
        let json = serde_json::to_value(&event).expect("serializable");
        assert_eq!(json["category"], "connection");
        assert_eq!(json["type"], "stateChanged");
        assert_eq!(json["previous"], "disconnected");
        assert_eq!(json["current"], "connecting");
    }

    #[test]
    fn notification_event_keeps_payload_opaque() {
        let event = NotificationEvent::Delivered {
            notification_type: "appointment_created".into(),
            data: serde_json::json!({ "id": 42, "nested": { "deep": true } }),
            timestamp: "2024-05-01T10:00:00Z".into(),
        };
        let json = serde_json::to_value(&event).expect("serializable");
        assert_eq!(json["notificationType"], "appointment_created");
        assert_eq!(json["data"]["nested"]["deep"], true);
    }
}
