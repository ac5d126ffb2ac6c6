//! Notification delivery channels.
//!
//! Three independent surfaces, each gated by its own preference flag:
//!
//! - [`sound`]: short synthesized audio cues
//! - [`toast`]: in-app toast queue with timed lifecycle
//! - [`desktop`]: native OS notifications for unfocused sessions

pub mod desktop;
pub mod sound;
pub mod toast;

pub use desktop::DesktopNotificationChannel;
pub use sound::{CueKind, SoundChannel, ToneSpec};
pub use toast::{
    CloseReason, ToastAction, ToastChannel, ToastEvent, ToastId, ToastPhase, ToastRequest,
    ToastSeverity, ToastView,
};
