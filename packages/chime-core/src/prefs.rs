//! User notification preferences with persistence and change notification.
//!
//! Preferences hydrate once from the key-value store at construction, live
//! in memory afterwards, and write through on every change. Unknown or
//! malformed stored fields fall back per-field to defaults rather than
//! discarding the whole record, so a half-corrupt store file costs the user
//! as little as possible.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_TOAST_DURATION_MS, MAX_TOAST_DURATION_MS, MIN_TOAST_DURATION_MS};
use crate::events::{ListenerId, ListenerRegistry};
use crate::platform::KeyValueStore;

/// Store key for the whole preference record.
const PREFERENCES_KEY: &str = "notification_preferences";

/// Legacy mirror of the sounds flag; written, never read back.
const SOUNDS_FLAG_KEY: &str = "notification_sounds_enabled";

/// Legacy mirror of the desktop flag; written, never read back.
const DESKTOP_FLAG_KEY: &str = "desktop_notifications_enabled";

/// Screen corner where toasts stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToastPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// The user's notification preferences.
///
/// Serialized with camelCase keys. Deserialization is lenient: every missing
/// field takes its default, and [`NotificationPreferences::clamp`] pulls
/// out-of-range numeric values back into bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPreferences {
    /// Play audio cues for notifications.
    pub sounds_enabled: bool,
    /// Post native desktop notifications.
    pub browser_notifications_enabled: bool,
    /// Show in-app toast notifications.
    pub toast_notifications_enabled: bool,
    /// Master cue volume, 0.0 to 1.0.
    pub sound_volume: f32,
    /// Toast auto-dismiss window in milliseconds.
    pub toast_duration_ms: u64,
    /// Screen corner where toasts stack.
    pub toast_position: ToastPosition,
    /// Show notification entries in the in-app inbox. Carried for shells;
    /// the core does not gate on it.
    pub show_in_app_notifications: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            sounds_enabled: true,
            browser_notifications_enabled: false,
            toast_notifications_enabled: true,
            sound_volume: 0.7,
            toast_duration_ms: DEFAULT_TOAST_DURATION_MS,
            toast_position: ToastPosition::BottomRight,
            show_in_app_notifications: true,
        }
    }
}

impl NotificationPreferences {
    /// Pulls numeric fields back into their valid ranges.
    pub fn clamp(&mut self) {
        self.sound_volume = self.sound_volume.clamp(0.0, 1.0);
        self.toast_duration_ms = self
            .toast_duration_ms
            .clamp(MIN_TOAST_DURATION_MS, MAX_TOAST_DURATION_MS);
    }

    /// Overlays recognized fields from a JSON value onto `self`.
    ///
    /// Fields that are missing or hold the wrong JSON type are skipped, so a
    /// partially valid record keeps what it can. Clamps at the end.
    fn merge_from_value(&mut self, value: &Value) {
        if let Some(v) = value.get("soundsEnabled").and_then(Value::as_bool) {
            self.sounds_enabled = v;
        }
        if let Some(v) = value
            .get("browserNotificationsEnabled")
            .and_then(Value::as_bool)
        {
            self.browser_notifications_enabled = v;
        }
        if let Some(v) = value
            .get("toastNotificationsEnabled")
            .and_then(Value::as_bool)
        {
            self.toast_notifications_enabled = v;
        }
        if let Some(v) = value.get("soundVolume").and_then(Value::as_f64) {
            self.sound_volume = v as f32;
        }
        if let Some(v) = value.get("toastDurationMs").and_then(Value::as_u64) {
            self.toast_duration_ms = v;
        }
        if let Some(v) = value.get("toastPosition") {
            if let Ok(position) = serde_json::from_value::<ToastPosition>(v.clone()) {
                self.toast_position = position;
            }
        }
        if let Some(v) = value
            .get("showInAppNotifications")
            .and_then(Value::as_bool)
        {
            self.show_in_app_notifications = v;
        }
        self.clamp();
    }
}

/// Owns the preference record and tells subscribers when it changes.
pub struct PreferenceStore {
    storage: Arc<dyn KeyValueStore>,
    current: RwLock<NotificationPreferences>,
    subscribers: ListenerRegistry<NotificationPreferences>,
}

impl PreferenceStore {
    /// Creates a store hydrated from `storage`.
    ///
    /// A missing record yields defaults; an unreadable one is logged,
    /// discarded, and replaced by defaults on the next write.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let mut prefs = NotificationPreferences::default();
        if let Some(raw) = storage.get(PREFERENCES_KEY) {
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) if value.is_object() => prefs.merge_from_value(&value),
                Ok(_) | Err(_) => {
                    log::warn!("[Prefs] Discarding unreadable preference record");
                }
            }
        }
        Self {
            storage,
            current: RwLock::new(prefs),
            subscribers: ListenerRegistry::new("Prefs"),
        }
    }

    /// Snapshot of the current preferences.
    #[must_use]
    pub fn get(&self) -> NotificationPreferences {
        self.current.read().clone()
    }

    /// Replaces the whole record.
    pub fn set(&self, prefs: NotificationPreferences) {
        self.apply(|current| *current = prefs);
    }

    /// Mutates the record in place.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use chime_core::platform::MemoryKeyValueStore;
    /// # use chime_core::prefs::PreferenceStore;
    /// let store = PreferenceStore::new(Arc::new(MemoryKeyValueStore::new()));
    /// store.update(|prefs| prefs.sound_volume = 0.4);
    /// assert_eq!(store.get().sound_volume, 0.4);
    /// ```
    pub fn update(&self, mutate: impl FnOnce(&mut NotificationPreferences)) {
        self.apply(mutate);
    }

    /// Restores defaults.
    pub fn reset(&self) {
        self.apply(|current| *current = NotificationPreferences::default());
    }

    fn apply(&self, mutate: impl FnOnce(&mut NotificationPreferences)) {
        let snapshot = {
            let mut current = self.current.write();
            mutate(&mut current);
            current.clamp();
            current.clone()
        };
        // Lock released before persistence and callbacks run. The in-memory
        // record is already authoritative; storage failures only cost
        // durability, never the change itself.
        self.persist(&snapshot);
        self.subscribers.emit(&snapshot);
    }

    fn persist(&self, prefs: &NotificationPreferences) {
        match serde_json::to_string(prefs) {
            Ok(serialized) => {
                if let Err(e) = self.storage.set(PREFERENCES_KEY, &serialized) {
                    log::warn!("[Prefs] Failed to persist preferences: {}", e);
                }
            }
            Err(e) => log::warn!("[Prefs] Failed to serialize preferences: {}", e),
        }
        // Mirror the two flags older shell versions read directly.
        let mirrors = [
            (SOUNDS_FLAG_KEY, prefs.sounds_enabled),
            (DESKTOP_FLAG_KEY, prefs.browser_notifications_enabled),
        ];
        for (key, flag) in mirrors {
            if let Err(e) = self.storage.set(key, if flag { "true" } else { "false" }) {
                log::warn!("[Prefs] Failed to mirror {}: {}", key, e);
            }
        }
    }

    /// Registers a callback invoked after every change with the new record.
    pub fn subscribe(
        &self,
        listener: impl Fn(&NotificationPreferences) + Send + Sync + 'static,
    ) -> ListenerId {
        self.subscribers.add(listener)
    }

    /// Removes a change subscription.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.subscribers.remove(id)
    }

    /// Serializes the current record as pretty JSON.
    #[must_use]
    pub fn export(&self) -> String {
        serde_json::to_string_pretty(&self.get()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Applies a record exported earlier (or hand-edited JSON).
    ///
    /// Returns `true` if the input was a JSON object and was applied,
    /// `false` otherwise. Never panics on malformed input; unrecognized
    /// fields inside a valid object are ignored.
    pub fn import(&self, raw: &str) -> bool {
        let Ok(value) = serde_json::from_str::<Value>(raw) else {
            return false;
        };
        if !value.is_object() {
            return false;
        }
        self.apply(|current| current.merge_from_value(&value));
        true
    }
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("current", &*self.current.read())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
