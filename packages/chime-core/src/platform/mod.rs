//! Platform capability abstractions.
//!
//! The core never talks to an operating system facility directly. Each
//! capability is a trait with at least one headless implementation, so the
//! whole subsystem runs in tests and server-side embeddings without an audio
//! device, a notification daemon, or a window system:
//!
//! - [`KeyValueStore`]: synchronous string storage for preferences
//! - [`AudioSink`]: PCM clip playback for audio cues
//! - [`DesktopNotifier`]: native OS notification posting
//! - [`FocusProbe`]: application focus queries
//!
//! Shipping shells provide real adapters at bootstrap time.

mod audio;
mod desktop;
mod focus;
mod storage;

pub use audio::{AudioClip, AudioSink, AudioSinkError, NullAudioSink};
pub use desktop::{
    DesktopNote, DesktopNotifier, DesktopNotifyError, NoopDesktopNotifier, Permission,
};
pub use focus::{FocusProbe, StaticFocusProbe};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StoreError, StoreResult};
