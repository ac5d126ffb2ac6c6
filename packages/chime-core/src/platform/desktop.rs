//! Native desktop notification abstraction.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

/// Permission state for posting desktop notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The user granted permission.
    Granted,
    /// The user denied permission. Prompting again is pointless.
    Denied,
    /// The user has not decided yet; a prompt may be shown.
    Default,
}

/// Errors from desktop notification operations.
#[derive(Debug, Error)]
pub enum DesktopNotifyError {
    /// The host has no notification facility at all.
    #[error("Desktop notifications are not supported on this host")]
    Unsupported,

    /// The notification could not be posted.
    #[error("Failed to post desktop notification: {0}")]
    Post(String),
}

/// A desktop notification ready for posting.
#[derive(Debug, Clone)]
pub struct DesktopNote {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Optional icon reference (path or URL, adapter-defined).
    pub icon: Option<String>,
    /// Optional coalescing tag; a new note with the same tag replaces the
    /// old one on hosts that support it.
    pub tag: Option<String>,
    /// Payload carried through to the click handler.
    pub data: Option<Value>,
    /// Keep the note on screen until the user addresses it.
    pub require_interaction: bool,
    /// Suppress the host's own notification sound.
    pub silent: bool,
}

impl DesktopNote {
    /// Creates a note with the given title and body.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
            tag: None,
            data: None,
            require_interaction: false,
            silent: true,
        }
    }

    /// Sets the icon reference.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Sets the coalescing tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attaches a payload for the click handler.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Keeps the note on screen until addressed.
    #[must_use]
    pub fn require_interaction(mut self) -> Self {
        self.require_interaction = true;
        self
    }

    /// Controls the host notification sound.
    #[must_use]
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}

/// Posts notifications through the host OS.
///
/// The click contract: `post` returns a oneshot receiver that resolves when
/// the user activates the notification. The adapter closes the native note
/// itself on activation. If the note is dismissed or expires unclicked, the
/// adapter drops the sender and the receiver resolves with an error, which
/// callers treat as "no click".
#[async_trait]
pub trait DesktopNotifier: Send + Sync {
    /// Whether this host can show notifications at all.
    fn is_supported(&self) -> bool;

    /// Current permission state without prompting.
    fn permission(&self) -> Permission;

    /// Asks the user for permission. Resolves with the resulting state; on
    /// hosts without a permission model this returns the static answer.
    async fn request_permission(&self) -> Permission;

    /// Posts a notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejected the note or has no notification
    /// facility.
    async fn post(&self, note: &DesktopNote) -> Result<oneshot::Receiver<()>, DesktopNotifyError>;
}

/// Notifier for hosts without a notification facility.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDesktopNotifier;

#[async_trait]
impl DesktopNotifier for NoopDesktopNotifier {
    fn is_supported(&self) -> bool {
        false
    }

    fn permission(&self) -> Permission {
        Permission::Denied
    }

    async fn request_permission(&self) -> Permission {
        Permission::Denied
    }

    async fn post(&self, _note: &DesktopNote) -> Result<oneshot::Receiver<()>, DesktopNotifyError> {
        Err(DesktopNotifyError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_builder_fills_optional_fields() {
        let note = DesktopNote::new("Appointment", "Dr. Vance, 2pm")
            .with_tag("appointment-42")
            .with_data(serde_json::json!({ "id": 42 }))
            .require_interaction();

        assert_eq!(note.title, "Appointment");
        assert_eq!(note.tag.as_deref(), Some("appointment-42"));
        assert!(note.require_interaction);
        assert!(note.silent, "host sound stays off unless asked for");
        assert!(note.icon.is_none());
    }

    #[tokio::test]
    async fn noop_notifier_refuses_everything() {
        let notifier = NoopDesktopNotifier;
        assert!(!notifier.is_supported());
        assert_eq!(notifier.permission(), Permission::Denied);
        assert_eq!(notifier.request_permission().await, Permission::Denied);
        assert!(notifier
            .post(&DesktopNote::new("t", "b"))
            .await
            .is_err());
    }
}
