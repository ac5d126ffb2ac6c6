//! Fixed protocol and timing constants that should NOT be changed.
//!
//! These values are part of the hub contract and the UX timings shells
//! animate against. Changing them silently breaks either wire compatibility
//! with the portal backend or the visual behavior clients expect.

// ─────────────────────────────────────────────────────────────────────────────
// Hub Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Path of the notifications hub, appended to the derived WebSocket origin.
pub const NOTIFICATIONS_HUB_PATH: &str = "/hubs/notifications";

/// Reconnect delays (milliseconds), indexed by consecutive retry count.
///
/// The first retry is immediate so a transient drop heals without a visible
/// gap; later retries back off so a struggling backend isn't hammered.
/// Retry counts past the end of the schedule saturate at the final entry.
pub const RECONNECT_DELAYS_MS: [u64; 5] = [0, 2_000, 10_000, 30_000, 30_000];

/// Interval between keep-alive pings while connected (seconds).
///
/// Short enough to keep NAT bindings and proxies from timing out an idle
/// session, long enough to be negligible traffic.
pub const KEEPALIVE_INTERVAL_SECS: u64 = 15;

/// Capacity of the outbound invocation channel (session loop inbox).
pub const COMMAND_CHANNEL_CAPACITY: usize = 32;

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Number of message fingerprints remembered for duplicate suppression.
///
/// 100 entries comfortably covers the replay burst the backend produces
/// around a reconnect; older fingerprints age out FIFO.
pub const DEDUP_CACHE_CAPACITY: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the event broadcast channel for UI subscribers.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Toast Timings
// ─────────────────────────────────────────────────────────────────────────────

/// Delay before a pushed toast is promoted from entering to visible (ms).
///
/// One animation frame is enough for shells to mount the element with its
/// entry transition armed.
pub const TOAST_ENTER_MS: u64 = 20;

/// Window between a toast starting its exit and leaving the queue (ms).
///
/// Matches the exit animation length so shells can play it out before the
/// entry disappears from queue snapshots.
pub const TOAST_EXIT_MS: u64 = 300;

/// Interval between auto-dismiss progress samples (ms).
pub const TOAST_PROGRESS_TICK_MS: u64 = 100;

/// Default auto-dismiss duration (ms).
pub const DEFAULT_TOAST_DURATION_MS: u64 = 5_000;

/// Minimum configurable auto-dismiss duration (ms).
pub const MIN_TOAST_DURATION_MS: u64 = 1_000;

/// Maximum configurable auto-dismiss duration (ms).
pub const MAX_TOAST_DURATION_MS: u64 = 30_000;

// ─────────────────────────────────────────────────────────────────────────────
// Audio Cues
// ─────────────────────────────────────────────────────────────────────────────

/// Sample rate for rendered cue clips (Hz).
///
/// 48kHz is the standard for digital audio and what every sink we target
/// accepts natively.
pub const CUE_SAMPLE_RATE: u32 = 48_000;

/// Linear attack at the start of a cue (ms).
///
/// Ramping up from silence avoids the click of an instantaneous waveform
/// edge.
pub const CUE_ATTACK_MS: u32 = 10;

/// Gain floor the exponential decay ramps down to.
///
/// 0.001 is -60dB, inaudible on consumer hardware, so clips end silent
/// without a hard cut.
pub const CUE_MIN_GAIN: f32 = 0.001;
