//! In-app toast queue.
//!
//! Toasts move through a three-phase lifecycle driven by per-toast timers:
//! they enter briefly in `Entering` (so shells can animate them in), sit in
//! `Visible` while a progress tracker counts down, and spend a fixed exit
//! window in `Exiting` before removal. Every phase change and progress tick
//! is emitted as a [`ToastEvent`]; the queue itself holds the authoritative
//! state that [`ToastChannel::toasts`] snapshots.
//!
//! Closing is exactly-once per toast no matter how many sources race for it
//! (auto-dismiss, manual close, actions, view). The first close wins and
//! cancels the toast's timers; later attempts are absorbed.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::{interval_at, sleep, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::constants::{TOAST_ENTER_MS, TOAST_EXIT_MS, TOAST_PROGRESS_TICK_MS};
use crate::events::EventEmitter;
use crate::prefs::PreferenceStore;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::utils::now_millis;

/// Unique toast handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ToastId(String);

impl ToastId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ToastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Visual flavour of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ToastSeverity {
    Success,
    Error,
    Warning,
    Info,
}

/// Lifecycle phase of a queued toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ToastPhase {
    /// Just pushed; shells animate it in.
    Entering,
    /// On screen, progress tracker running.
    Visible,
    /// Closed; shells animate it out until removal.
    Exiting,
}

/// Why a toast closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseReason {
    /// Auto-dismiss window elapsed.
    Expired,
    /// Closed by hand.
    Dismissed,
    /// An action button ran.
    Action,
    /// The view callback ran.
    Viewed,
    /// The whole queue was cleared.
    Shutdown,
}

/// Toast lifecycle events for UI subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ToastEvent {
    /// A toast joined the queue.
    Pushed {
        toast_id: String,
        severity: ToastSeverity,
        timestamp: u64,
    },
    /// A toast moved to a new phase.
    PhaseChanged {
        toast_id: String,
        phase: ToastPhase,
        timestamp: u64,
    },
    /// Progress tracker tick; `remaining` runs 100 down to 0.
    Progress {
        toast_id: String,
        remaining: f32,
        timestamp: u64,
    },
    /// A toast closed. Removal follows after the exit window.
    Closed {
        toast_id: String,
        reason: CloseReason,
        timestamp: u64,
    },
    /// A toast left the queue.
    Removed { toast_id: String, timestamp: u64 },
}

/// A button on a toast.
#[derive(Clone)]
pub struct ToastAction {
    /// Button label.
    pub label: String,
    callback: Arc<dyn Fn() + Send + Sync>,
}

impl ToastAction {
    /// Creates an action with a label and a callback.
    pub fn new(label: impl Into<String>, callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            callback: Arc::new(callback),
        }
    }
}

impl std::fmt::Debug for ToastAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToastAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// What to show.
pub struct ToastRequest {
    pub severity: ToastSeverity,
    pub title: String,
    pub message: String,
    /// Auto-dismiss override in milliseconds. `None` takes the preference
    /// value; `Some(0)` makes the toast sticky.
    pub duration_ms: Option<u64>,
    pub actions: Vec<ToastAction>,
    on_view: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl ToastRequest {
    /// Creates a request with no actions and the preference duration.
    pub fn new(
        severity: ToastSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
            duration_ms: None,
            actions: Vec::new(),
            on_view: None,
        }
    }

    /// Overrides the auto-dismiss window. Zero means sticky.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Adds an action button.
    #[must_use]
    pub fn with_action(
        mut self,
        label: impl Into<String>,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.actions.push(ToastAction::new(label, callback));
        self
    }

    /// Sets the callback run when the toast is viewed.
    #[must_use]
    pub fn with_on_view(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_view = Some(Arc::new(callback));
        self
    }
}

/// Read-only snapshot of a queued toast.
#[derive(Debug, Clone)]
pub struct ToastView {
    pub id: ToastId,
    pub severity: ToastSeverity,
    pub title: String,
    pub message: String,
    pub phase: ToastPhase,
    /// Remaining progress, 100 down to 0. Stays 100 for sticky toasts.
    pub progress: f32,
    pub duration_ms: u64,
    pub action_labels: Vec<String>,
}

struct ToastEntry {
    id: ToastId,
    severity: ToastSeverity,
    title: String,
    message: String,
    phase: ToastPhase,
    progress: f32,
    duration_ms: u64,
    actions: Vec<ToastAction>,
    on_view: Option<Arc<dyn Fn() + Send + Sync>>,
    /// Cancelling stops this toast's entry/progress/dismiss timers. Each
    /// toast owns an independent token so clearing one cannot poison
    /// another.
    timers: CancellationToken,
}

struct ToastShared {
    entries: RwLock<Vec<ToastEntry>>,
    prefs: Arc<PreferenceStore>,
    emitter: Arc<dyn EventEmitter>,
    spawner: TokioSpawner,
}

/// The toast queue.
pub struct ToastChannel {
    shared: Arc<ToastShared>,
}

impl ToastChannel {
    /// Creates an empty queue.
    pub fn new(
        prefs: Arc<PreferenceStore>,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            shared: Arc::new(ToastShared {
                entries: RwLock::new(Vec::new()),
                prefs,
                emitter,
                spawner,
            }),
        }
    }

    /// Queues a toast.
    ///
    /// Returns `None` without queueing anything when toast notifications
    /// are disabled. Otherwise the toast starts in `Entering` and its
    /// lifecycle timers are running.
    pub fn push(&self, request: ToastRequest) -> Option<ToastId> {
        let prefs = self.shared.prefs.get();
        if !prefs.toast_notifications_enabled {
            return None;
        }

        let id = ToastId::generate();
        let duration_ms = request.duration_ms.unwrap_or(prefs.toast_duration_ms);
        let severity = request.severity;
        let cancel = CancellationToken::new();

        self.shared.entries.write().push(ToastEntry {
            id: id.clone(),
            severity,
            title: request.title,
            message: request.message,
            phase: ToastPhase::Entering,
            progress: 100.0,
            duration_ms,
            actions: request.actions,
            on_view: request.on_view,
            timers: cancel.clone(),
        });

        self.shared.emitter.emit_toast(ToastEvent::Pushed {
            toast_id: id.to_string(),
            severity,
            timestamp: now_millis(),
        });

        self.shared.spawner.spawn(drive_toast(
            Arc::clone(&self.shared),
            id.clone(),
            duration_ms,
            cancel,
        ));
        Some(id)
    }

    /// Closes a toast by hand.
    ///
    /// Returns `false` if the id is unknown or the toast is already
    /// closing.
    pub fn close(&self, id: &ToastId) -> bool {
        close_toast(&self.shared, id, CloseReason::Dismissed)
    }

    /// Runs the action at `index` on the given toast, then closes it.
    ///
    /// Returns `false` if the id or index is unknown. A panicking action is
    /// logged and the toast still closes.
    pub fn invoke_action(&self, id: &ToastId, index: usize) -> bool {
        let callback = {
            let entries = self.shared.entries.read();
            let Some(entry) = entries.iter().find(|entry| entry.id == *id) else {
                return false;
            };
            let Some(action) = entry.actions.get(index) else {
                return false;
            };
            Arc::clone(&action.callback)
        };
        run_isolated("Action", &*callback);
        close_toast(&self.shared, id, CloseReason::Action);
        true
    }

    /// Marks a toast as viewed: runs its view callback, if any, then
    /// closes it.
    ///
    /// Returns `false` if the id is unknown.
    pub fn view(&self, id: &ToastId) -> bool {
        let callback = {
            let entries = self.shared.entries.read();
            let Some(entry) = entries.iter().find(|entry| entry.id == *id) else {
                return false;
            };
            entry.on_view.clone()
        };
        if let Some(callback) = callback {
            run_isolated("View", &*callback);
        }
        close_toast(&self.shared, id, CloseReason::Viewed);
        true
    }

    /// Snapshot of the queue in insertion order.
    #[must_use]
    pub fn toasts(&self) -> Vec<ToastView> {
        self.shared
            .entries
            .read()
            .iter()
            .map(|entry| ToastView {
                id: entry.id.clone(),
                severity: entry.severity,
                title: entry.title.clone(),
                message: entry.message.clone(),
                phase: entry.phase,
                progress: entry.progress,
                duration_ms: entry.duration_ms,
                action_labels: entry.actions.iter().map(|a| a.label.clone()).collect(),
            })
            .collect()
    }

    /// Number of queued toasts, exiting ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.entries.read().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.entries.read().is_empty()
    }

    /// Drops every toast immediately, skipping the exit window.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.shared.entries.write());
        for entry in &drained {
            entry.timers.cancel();
        }
        for entry in drained {
            let timestamp = now_millis();
            self.shared.emitter.emit_toast(ToastEvent::Closed {
                toast_id: entry.id.to_string(),
                reason: CloseReason::Shutdown,
                timestamp,
            });
            self.shared.emitter.emit_toast(ToastEvent::Removed {
                toast_id: entry.id.to_string(),
                timestamp,
            });
        }
    }
}

impl std::fmt::Debug for ToastChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToastChannel").field("len", &self.len()).finish()
    }
}

/// Runs the entry, progress, and auto-dismiss timers of one toast.
async fn drive_toast(
    shared: Arc<ToastShared>,
    id: ToastId,
    duration_ms: u64,
    cancel: CancellationToken,
) {
    tokio::select! {
        () = cancel.cancelled() => return,
        () = sleep(Duration::from_millis(TOAST_ENTER_MS)) => {}
    }
    set_phase(&shared, &id, ToastPhase::Visible);

    if duration_ms == 0 {
        // Sticky: stays until closed by hand.
        return;
    }

    let started = Instant::now();
    let deadline = started + Duration::from_millis(duration_ms);
    let tick = Duration::from_millis(TOAST_PROGRESS_TICK_MS);
    let mut ticker = interval_at(started + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tracker_done = false;

    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = sleep_until(deadline) => {
                close_toast(&shared, &id, CloseReason::Expired);
                return;
            }
            _ = ticker.tick(), if !tracker_done => {
                let elapsed = started.elapsed().as_millis() as f32;
                let remaining = (100.0 * (1.0 - elapsed / duration_ms as f32)).max(0.0);
                set_progress(&shared, &id, remaining);
                if remaining <= 0.0 {
                    // Exhausted progress only stops the tracker. Dismissal
                    // belongs to the deadline branch.
                    tracker_done = true;
                }
            }
        }
    }
}

fn set_phase(shared: &Arc<ToastShared>, id: &ToastId, phase: ToastPhase) {
    {
        let mut entries = shared.entries.write();
        let Some(entry) = entries.iter_mut().find(|entry| entry.id == *id) else {
            return;
        };
        entry.phase = phase;
    }
    shared.emitter.emit_toast(ToastEvent::PhaseChanged {
        toast_id: id.to_string(),
        phase,
        timestamp: now_millis(),
    });
}

fn set_progress(shared: &Arc<ToastShared>, id: &ToastId, remaining: f32) {
    {
        let mut entries = shared.entries.write();
        let Some(entry) = entries.iter_mut().find(|entry| entry.id == *id) else {
            return;
        };
        entry.progress = remaining;
    }
    shared.emitter.emit_toast(ToastEvent::Progress {
        toast_id: id.to_string(),
        remaining,
        timestamp: now_millis(),
    });
}

/// Moves a toast to `Exiting` and schedules its removal.
///
/// The single place a toast can close. Returns `false` when the toast is
/// unknown or already exiting, which is what makes closing exactly-once.
fn close_toast(shared: &Arc<ToastShared>, id: &ToastId, reason: CloseReason) -> bool {
    {
        let mut entries = shared.entries.write();
        let Some(entry) = entries.iter_mut().find(|entry| entry.id == *id) else {
            return false;
        };
        if entry.phase == ToastPhase::Exiting {
            return false;
        }
        entry.phase = ToastPhase::Exiting;
        entry.timers.cancel();
    }

    let timestamp = now_millis();
    shared.emitter.emit_toast(ToastEvent::PhaseChanged {
        toast_id: id.to_string(),
        phase: ToastPhase::Exiting,
        timestamp,
    });
    shared.emitter.emit_toast(ToastEvent::Closed {
        toast_id: id.to_string(),
        reason,
        timestamp,
    });

    // Removal is delayed so shells can run the exit animation. Not tied to
    // the toast's own timers, those were just cancelled.
    let exit_shared = Arc::clone(shared);
    let exit_id = id.clone();
    shared.spawner.spawn(async move {
        sleep(Duration::from_millis(TOAST_EXIT_MS)).await;
        remove_toast(&exit_shared, &exit_id);
    });
    true
}

fn remove_toast(shared: &Arc<ToastShared>, id: &ToastId) {
    let removed = {
        let mut entries = shared.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.id != *id);
        entries.len() != before
    };
    if removed {
        shared.emitter.emit_toast(ToastEvent::Removed {
            toast_id: id.to_string(),
            timestamp: now_millis(),
        });
    }
}

fn run_isolated(label: &str, callback: &(dyn Fn() + Send + Sync)) {
    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)).is_err() {
        log::error!("[Toast] {} callback panicked", label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ActionEvent, ConnectionEvent, NotificationEvent};
    use crate::platform::MemoryKeyValueStore;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records toast events in arrival order.
    #[derive(Default)]
    struct RecordingEmitter {
        toast_events: Mutex<Vec<ToastEvent>>,
    }

    impl RecordingEmitter {
        fn closes(&self) -> Vec<CloseReason> {
            self.toast_events
                .lock()
                .iter()
                .filter_map(|event| match event {
                    ToastEvent::Closed { reason, .. } => Some(*reason),
                    _ => None,
                })
                .collect()
        }

        fn removed_count(&self) -> usize {
            self.toast_events
                .lock()
                .iter()
                .filter(|event| matches!(event, ToastEvent::Removed { .. }))
                .count()
        }

        fn last_progress(&self) -> Option<f32> {
            self.toast_events
                .lock()
                .iter()
                .rev()
                .find_map(|event| match event {
                    ToastEvent::Progress { remaining, .. } => Some(*remaining),
                    _ => None,
                })
        }
    }

    impl EventEmitter for RecordingEmitter {
        fn emit_connection(&self, _event: ConnectionEvent) {}

        fn emit_notification(&self, _event: NotificationEvent) {}

        fn emit_toast(&self, event: ToastEvent) {
            self.toast_events.lock().push(event);
        }

        fn emit_action(&self, _event: ActionEvent) {}
    }

    struct Fixture {
        channel: ToastChannel,
        prefs: Arc<PreferenceStore>,
        emitter: Arc<RecordingEmitter>,
    }

    fn fixture() -> Fixture {
        let prefs = Arc::new(PreferenceStore::new(Arc::new(MemoryKeyValueStore::new())));
        let emitter = Arc::new(RecordingEmitter::default());
        let channel = ToastChannel::new(
            Arc::clone(&prefs),
            Arc::clone(&emitter) as Arc<dyn EventEmitter>,
            TokioSpawner::current(),
        );
        Fixture {
            channel,
            prefs,
            emitter,
        }
    }

    fn info_toast() -> ToastRequest {
        ToastRequest::new(ToastSeverity::Info, "Heads up", "Something happened")
    }

    /// Lets spawned toast tasks run without moving the paused clock.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance_ms(ms: u64) {
        settle().await;
        tokio::time::advance(Duration::from_millis(ms)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn push_returns_none_when_toasts_disabled() {
        let fx = fixture();
        fx.prefs
            .update(|prefs| prefs.toast_notifications_enabled = false);

        assert!(fx.channel.push(info_toast()).is_none());
        assert!(fx.channel.is_empty());
        assert!(fx.emitter.toast_events.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn toast_becomes_visible_after_entry_window() {
        let fx = fixture();
        fx.channel.push(info_toast()).expect("queued");

        settle().await;
        assert_eq!(fx.channel.toasts()[0].phase, ToastPhase::Entering);

        advance_ms(TOAST_ENTER_MS).await;
        assert_eq!(fx.channel.toasts()[0].phase, ToastPhase::Visible);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_dismiss_closes_exactly_once() {
        let fx = fixture();
        fx.channel.push(info_toast()).expect("queued");

        advance_ms(TOAST_ENTER_MS).await;
        advance_ms(5_000).await;
        assert_eq!(fx.emitter.closes(), vec![CloseReason::Expired]);

        // Nothing further fires, however long we wait.
        advance_ms(60_000).await;
        assert_eq!(fx.emitter.closes(), vec![CloseReason::Expired]);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_toast_lingers_through_the_exit_window() {
        let fx = fixture();
        fx.channel.push(info_toast()).expect("queued");

        advance_ms(TOAST_ENTER_MS).await;
        advance_ms(5_000).await;

        // Closed but still queued for the exit animation.
        assert_eq!(fx.channel.len(), 1);
        assert_eq!(fx.channel.toasts()[0].phase, ToastPhase::Exiting);
        assert_eq!(fx.emitter.removed_count(), 0);

        advance_ms(TOAST_EXIT_MS).await;
        assert!(fx.channel.is_empty());
        assert_eq!(fx.emitter.removed_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_close_cancels_auto_dismiss() {
        let fx = fixture();
        let id = fx.channel.push(info_toast()).expect("queued");

        advance_ms(TOAST_ENTER_MS).await;
        assert!(fx.channel.close(&id));
        assert!(!fx.channel.close(&id), "second close is absorbed");

        advance_ms(60_000).await;
        assert_eq!(fx.emitter.closes(), vec![CloseReason::Dismissed]);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_tracks_the_remaining_window() {
        let fx = fixture();
        fx.channel.push(info_toast()).expect("queued");

        advance_ms(TOAST_ENTER_MS).await;
        advance_ms(2_500).await;

        let progress = fx.channel.toasts()[0].progress;
        assert!(
            (progress - 50.0).abs() < 3.0,
            "halfway through 5000 ms, got {progress}"
        );
        assert_eq!(fx.emitter.last_progress(), Some(progress));
        assert_eq!(fx.emitter.closes(), Vec::<CloseReason>::new());
    }

    #[tokio::test(start_paused = true)]
    async fn dismissal_comes_from_the_deadline_not_the_tracker() {
        let fx = fixture();
        let id = fx
            .channel
            .push(info_toast().with_duration_ms(1_000))
            .expect("queued");

        advance_ms(TOAST_ENTER_MS).await;
        advance_ms(999).await;
        assert!(
            fx.channel.toasts().iter().any(|t| t.id == id),
            "still alive one tick before the deadline"
        );
        assert_eq!(fx.emitter.closes(), Vec::<CloseReason>::new());

        advance_ms(1).await;
        assert_eq!(fx.emitter.closes(), vec![CloseReason::Expired]);
    }

    #[tokio::test(start_paused = true)]
    async fn sticky_toast_never_auto_dismisses() {
        let fx = fixture();
        let id = fx
            .channel
            .push(info_toast().with_duration_ms(0))
            .expect("queued");

        advance_ms(TOAST_ENTER_MS).await;
        advance_ms(120_000).await;
        assert_eq!(fx.channel.toasts()[0].phase, ToastPhase::Visible);
        assert_eq!(fx.emitter.closes(), Vec::<CloseReason>::new());

        assert!(fx.channel.close(&id));
        assert_eq!(fx.emitter.closes(), vec![CloseReason::Dismissed]);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_preserves_insertion_order() {
        let fx = fixture();
        for title in ["first", "second", "third"] {
            fx.channel
                .push(ToastRequest::new(ToastSeverity::Info, title, ""))
                .expect("queued");
        }

        let titles: Vec<_> = fx.channel.toasts().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[tokio::test(start_paused = true)]
    async fn action_runs_then_closes() {
        let fx = fixture();
        let runs = Arc::new(AtomicUsize::new(0));

        let runs_clone = Arc::clone(&runs);
        let id = fx
            .channel
            .push(info_toast().with_action("Open", move || {
                runs_clone.fetch_add(1, Ordering::SeqCst);
            }))
            .expect("queued");
        advance_ms(TOAST_ENTER_MS).await;

        assert!(fx.channel.invoke_action(&id, 0));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(fx.emitter.closes(), vec![CloseReason::Action]);

        assert!(!fx.channel.invoke_action(&id, 5), "unknown index refused");
        let unknown = ToastId("nope".into());
        assert!(!fx.channel.invoke_action(&unknown, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn view_runs_callback_then_closes() {
        let fx = fixture();
        let views = Arc::new(AtomicUsize::new(0));

        let views_clone = Arc::clone(&views);
        let id = fx
            .channel
            .push(info_toast().with_on_view(move || {
                views_clone.fetch_add(1, Ordering::SeqCst);
            }))
            .expect("queued");
        advance_ms(TOAST_ENTER_MS).await;

        assert!(fx.channel.view(&id));
        assert_eq!(views.load(Ordering::SeqCst), 1);
        assert_eq!(fx.emitter.closes(), vec![CloseReason::Viewed]);
    }

    #[tokio::test(start_paused = true)]
    async fn view_without_callback_still_closes() {
        let fx = fixture();
        let id = fx.channel.push(info_toast()).expect("queued");
        advance_ms(TOAST_ENTER_MS).await;

        assert!(fx.channel.view(&id));
        assert_eq!(fx.emitter.closes(), vec![CloseReason::Viewed]);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_action_still_closes_the_toast() {
        let fx = fixture();
        let id = fx
            .channel
            .push(info_toast().with_action("Boom", || panic!("action exploded")))
            .expect("queued");
        advance_ms(TOAST_ENTER_MS).await;

        assert!(fx.channel.invoke_action(&id, 0));
        assert_eq!(fx.emitter.closes(), vec![CloseReason::Action]);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_drops_everything_at_once() {
        let fx = fixture();
        fx.channel.push(info_toast()).expect("queued");
        fx.channel.push(info_toast()).expect("queued");
        advance_ms(TOAST_ENTER_MS).await;

        fx.channel.clear();
        assert!(fx.channel.is_empty());
        assert_eq!(
            fx.emitter.closes(),
            vec![CloseReason::Shutdown, CloseReason::Shutdown]
        );
        assert_eq!(fx.emitter.removed_count(), 2);

        // Cancelled timers stay quiet afterwards.
        let events_before = fx.emitter.toast_events.lock().len();
        advance_ms(60_000).await;
        assert_eq!(fx.emitter.toast_events.lock().len(), events_before);
    }

    #[tokio::test(start_paused = true)]
    async fn duration_override_beats_the_preference() {
        let fx = fixture();
        fx.prefs.update(|prefs| prefs.toast_duration_ms = 30_000);

        fx.channel
            .push(info_toast().with_duration_ms(1_000))
            .expect("queued");
        advance_ms(TOAST_ENTER_MS).await;
        advance_ms(1_000).await;

        assert_eq!(fx.emitter.closes(), vec![CloseReason::Expired]);
    }

    #[tokio::test(start_paused = true)]
    async fn preference_duration_applies_when_not_overridden() {
        let fx = fixture();
        fx.prefs.update(|prefs| prefs.toast_duration_ms = 2_000);

        fx.channel.push(info_toast()).expect("queued");
        advance_ms(TOAST_ENTER_MS).await;
        advance_ms(1_900).await;
        assert_eq!(fx.emitter.closes(), Vec::<CloseReason>::new());

        advance_ms(100).await;
        assert_eq!(fx.emitter.closes(), vec![CloseReason::Expired]);
    }
}
