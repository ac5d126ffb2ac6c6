//! Wire format of the notifications hub.
//!
//! All frames are JSON text. Client frames carry an `invocation` tag, hub
//! frames an `event` tag. Notification payloads stay opaque [`Value`]s from
//! the socket all the way to delivery listeners.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames the client sends to the hub.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "invocation")]
pub enum ClientInvocation {
    /// Keepalive probe.
    Ping,
    /// Subscribe to a notification group.
    JoinGroup { group: String },
    /// Unsubscribe from a notification group.
    LeaveGroup { group: String },
}

/// Frames the hub sends to the client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event")]
pub enum ServerMessage {
    /// Handshake acknowledgement after the upgrade completes.
    Connected,
    /// Keepalive answer.
    Pong,
    /// Group subscription acknowledged.
    JoinedGroup { group: String },
    /// Group unsubscription acknowledged.
    LeftGroup { group: String },
    /// A published notification.
    Notification {
        #[serde(rename = "type")]
        event_type: String,
        data: Value,
        timestamp: String,
    },
}

/// A notification as handed to raw listeners and the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Domain event name, e.g. `appointment_created`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque payload as published by the backend.
    pub data: Value,
    /// Publisher timestamp. Treated as an opaque identity token for
    /// de-duplication, never parsed as a date.
    pub timestamp: String,
}
