//! Native desktop notifications.
//!
//! This channel fronts the platform [`DesktopNotifier`] with the full gate
//! chain: the desktop preference, host support, then permission. Permission
//! is cached at construction and refreshed whenever the user is prompted,
//! so a session sees at most one prompt until something changes the cached
//! answer. Clicking a posted note focuses the application and, when the
//! payload names an action, raises an [`ActionEvent`] for shells to route.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::events::{ActionEvent, EventEmitter};
use crate::platform::{DesktopNote, DesktopNotifier, FocusProbe, Permission};
use crate::prefs::PreferenceStore;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::utils::now_millis;

/// Delivers notifications through the host OS.
pub struct DesktopNotificationChannel {
    prefs: Arc<PreferenceStore>,
    notifier: Arc<dyn DesktopNotifier>,
    focus: Arc<dyn FocusProbe>,
    emitter: Arc<dyn EventEmitter>,
    spawner: TokioSpawner,
    permission: Mutex<Permission>,
}

impl DesktopNotificationChannel {
    /// Creates the channel, caching the notifier's current permission.
    pub fn new(
        prefs: Arc<PreferenceStore>,
        notifier: Arc<dyn DesktopNotifier>,
        focus: Arc<dyn FocusProbe>,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
    ) -> Self {
        let permission = Mutex::new(notifier.permission());
        Self {
            prefs,
            notifier,
            focus,
            emitter,
            spawner,
            permission,
        }
    }

    /// The cached permission state.
    #[must_use]
    pub fn permission(&self) -> Permission {
        *self.permission.lock()
    }

    /// Prompts the user and refreshes the cached permission.
    pub async fn request_permission(&self) -> Permission {
        let permission = self.notifier.request_permission().await;
        *self.permission.lock() = permission;
        permission
    }

    /// Posts a notification regardless of focus.
    ///
    /// Walks the gate chain in order: desktop preference, host support,
    /// permission. An undecided permission triggers at most one prompt per
    /// call; a denial is cached, so later calls fail fast without prompting.
    /// Returns an opaque id for the posted note, or `None` when any gate
    /// declined or posting failed.
    pub async fn show(&self, note: DesktopNote) -> Option<String> {
        if !self.prefs.get().browser_notifications_enabled {
            return None;
        }
        if !self.notifier.is_supported() {
            return None;
        }

        let permission = match self.permission() {
            Permission::Granted => Permission::Granted,
            Permission::Denied => return None,
            Permission::Default => self.request_permission().await,
        };
        if permission != Permission::Granted {
            return None;
        }

        let click_rx = match self.notifier.post(&note).await {
            Ok(rx) => rx,
            Err(e) => {
                log::warn!("[Desktop] Could not post notification: {}", e);
                return None;
            }
        };

        let posted_id = Uuid::new_v4().to_string();
        let focus = Arc::clone(&self.focus);
        let emitter = Arc::clone(&self.emitter);
        let data = note.data;
        self.spawner.spawn(async move {
            // Resolves on activation; an error means dismissed unclicked.
            if click_rx.await.is_err() {
                return;
            }
            focus.request_focus();
            let action = data
                .as_ref()
                .and_then(|payload| payload.get("action"))
                .and_then(Value::as_str);
            if let Some(action) = action {
                emitter.emit_action(ActionEvent::Invoked {
                    action: action.to_string(),
                    data: data.unwrap_or(Value::Null),
                    timestamp: now_millis(),
                });
            }
        });
        Some(posted_id)
    }

    /// Posts a notification only when the application is not focused.
    ///
    /// The usual entry point: a user already looking at the app gets the
    /// toast instead, not a competing OS notification.
    pub async fn show_if_not_focused(&self, note: DesktopNote) -> Option<String> {
        if self.focus.is_focused() {
            return None;
        }
        self.show(note).await
    }
}

impl std::fmt::Debug for DesktopNotificationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopNotificationChannel")
            .field("permission", &self.permission())
            .field("supported", &self.notifier.is_supported())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ConnectionEvent, NotificationEvent, ToastEvent};
    use crate::platform::{DesktopNotifyError, MemoryKeyValueStore, StaticFocusProbe};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    /// Notifier double with scriptable support, permission, and prompts.
    struct RecordingNotifier {
        supported: bool,
        permission: Mutex<Permission>,
        grant_on_request: bool,
        prompts: AtomicUsize,
        posted: Mutex<Vec<DesktopNote>>,
        click_tx: Mutex<Option<oneshot::Sender<()>>>,
    }

    impl RecordingNotifier {
        fn new(supported: bool, permission: Permission, grant_on_request: bool) -> Self {
            Self {
                supported,
                permission: Mutex::new(permission),
                grant_on_request,
                prompts: AtomicUsize::new(0),
                posted: Mutex::new(Vec::new()),
                click_tx: Mutex::new(None),
            }
        }

        fn posted_count(&self) -> usize {
            self.posted.lock().len()
        }

        fn click(&self) {
            let sender = self.click_tx.lock().take().expect("a note was posted");
            sender.send(()).expect("click handler alive");
        }

        fn dismiss(&self) {
            drop(self.click_tx.lock().take());
        }
    }

    #[async_trait]
    impl DesktopNotifier for RecordingNotifier {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn permission(&self) -> Permission {
            *self.permission.lock()
        }

        async fn request_permission(&self) -> Permission {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            let granted = if self.grant_on_request {
                Permission::Granted
            } else {
                Permission::Denied
            };
            *self.permission.lock() = granted;
            granted
        }

        async fn post(
            &self,
            note: &DesktopNote,
        ) -> Result<oneshot::Receiver<()>, DesktopNotifyError> {
            self.posted.lock().push(note.clone());
            let (tx, rx) = oneshot::channel();
            *self.click_tx.lock() = Some(tx);
            Ok(rx)
        }
    }

    /// Emitter that records action events only.
    #[derive(Default)]
    struct ActionRecorder {
        actions: Mutex<Vec<ActionEvent>>,
    }

    impl EventEmitter for ActionRecorder {
        fn emit_connection(&self, _event: ConnectionEvent) {}

        fn emit_notification(&self, _event: NotificationEvent) {}

        fn emit_toast(&self, _event: ToastEvent) {}

        fn emit_action(&self, event: ActionEvent) {
            self.actions.lock().push(event);
        }
    }

    struct Fixture {
        channel: DesktopNotificationChannel,
        notifier: Arc<RecordingNotifier>,
        focus: Arc<StaticFocusProbe>,
        actions: Arc<ActionRecorder>,
        prefs: Arc<PreferenceStore>,
    }

    fn fixture(notifier: RecordingNotifier) -> Fixture {
        let prefs = Arc::new(PreferenceStore::new(Arc::new(MemoryKeyValueStore::new())));
        // Desktop notifications default off; most tests want them on.
        prefs.update(|p| p.browser_notifications_enabled = true);

        let notifier = Arc::new(notifier);
        let focus = Arc::new(StaticFocusProbe::unfocused());
        let actions = Arc::new(ActionRecorder::default());
        let channel = DesktopNotificationChannel::new(
            Arc::clone(&prefs),
            Arc::clone(&notifier) as Arc<dyn DesktopNotifier>,
            Arc::clone(&focus) as Arc<dyn FocusProbe>,
            Arc::clone(&actions) as Arc<dyn EventEmitter>,
            TokioSpawner::current(),
        );
        Fixture {
            channel,
            notifier,
            focus,
            actions,
            prefs,
        }
    }

    fn note() -> DesktopNote {
        DesktopNote::new("New appointment", "Dr. Vance, 2pm")
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn disabled_preference_blocks_posting() {
        let fx = fixture(RecordingNotifier::new(true, Permission::Granted, false));
        fx.prefs.update(|p| p.browser_notifications_enabled = false);

        assert!(fx.channel.show(note()).await.is_none());
        assert_eq!(fx.notifier.posted_count(), 0);
    }

    #[tokio::test]
    async fn unsupported_host_blocks_posting() {
        let fx = fixture(RecordingNotifier::new(false, Permission::Granted, false));

        assert!(fx.channel.show(note()).await.is_none());
        assert_eq!(fx.notifier.posted_count(), 0);
    }

    #[tokio::test]
    async fn denied_permission_blocks_without_prompting() {
        let fx = fixture(RecordingNotifier::new(true, Permission::Denied, true));

        assert!(fx.channel.show(note()).await.is_none());
        assert_eq!(fx.notifier.prompts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecided_permission_prompts_once_and_caches_denial() {
        let fx = fixture(RecordingNotifier::new(true, Permission::Default, false));

        assert!(fx.channel.show(note()).await.is_none());
        assert_eq!(fx.notifier.prompts.load(Ordering::SeqCst), 1);

        // The denial is cached; no second prompt.
        assert!(fx.channel.show(note()).await.is_none());
        assert_eq!(fx.notifier.prompts.load(Ordering::SeqCst), 1);
        assert_eq!(fx.channel.permission(), Permission::Denied);
    }

    #[tokio::test]
    async fn granted_prompt_posts_and_caches() {
        let fx = fixture(RecordingNotifier::new(true, Permission::Default, true));

        assert!(fx.channel.show(note()).await.is_some());
        assert_eq!(fx.notifier.prompts.load(Ordering::SeqCst), 1);
        assert_eq!(fx.notifier.posted_count(), 1);
        assert_eq!(fx.channel.permission(), Permission::Granted);

        // Already granted; straight to posting.
        assert!(fx.channel.show(note()).await.is_some());
        assert_eq!(fx.notifier.prompts.load(Ordering::SeqCst), 1);
        assert_eq!(fx.notifier.posted_count(), 2);
    }

    #[tokio::test]
    async fn focused_application_suppresses_the_note() {
        let fx = fixture(RecordingNotifier::new(true, Permission::Granted, false));
        fx.focus.set_focused(true);

        assert!(fx.channel.show_if_not_focused(note()).await.is_none());
        assert_eq!(fx.notifier.posted_count(), 0);

        fx.focus.set_focused(false);
        assert!(fx.channel.show_if_not_focused(note()).await.is_some());
        assert_eq!(fx.notifier.posted_count(), 1);
    }

    #[tokio::test]
    async fn click_focuses_and_raises_the_payload_action() {
        let fx = fixture(RecordingNotifier::new(true, Permission::Granted, false));

        let posted = fx
            .channel
            .show(note().with_data(serde_json::json!({
                "action": "openAppointment",
                "id": 42
            })))
            .await;
        assert!(posted.is_some());

        fx.notifier.click();
        settle().await;

        assert!(fx.focus.is_focused(), "click pulls the app forward");
        let actions = fx.actions.actions.lock();
        assert_eq!(actions.len(), 1);
        let ActionEvent::Invoked { action, data, .. } = &actions[0];
        assert_eq!(action, "openAppointment");
        assert_eq!(data["id"], 42);
    }

    #[tokio::test]
    async fn click_without_action_payload_only_focuses() {
        let fx = fixture(RecordingNotifier::new(true, Permission::Granted, false));

        fx.channel.show(note()).await.expect("posted");
        fx.notifier.click();
        settle().await;

        assert!(fx.focus.is_focused());
        assert!(fx.actions.actions.lock().is_empty());
    }

    #[tokio::test]
    async fn dismissal_stays_quiet() {
        let fx = fixture(RecordingNotifier::new(true, Permission::Granted, false));

        fx.channel.show(note()).await.expect("posted");
        fx.notifier.dismiss();
        settle().await;

        assert!(!fx.focus.is_focused());
        assert!(fx.actions.actions.lock().is_empty());
    }

    #[tokio::test]
    async fn request_permission_refreshes_the_cache() {
        let fx = fixture(RecordingNotifier::new(true, Permission::Denied, true));
        assert_eq!(fx.channel.permission(), Permission::Denied);

        assert_eq!(fx.channel.request_permission().await, Permission::Granted);
        assert_eq!(fx.channel.permission(), Permission::Granted);
        assert!(fx.channel.show(note()).await.is_some());
    }
}
