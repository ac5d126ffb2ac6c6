//! Chime Core - real-time notification delivery.
//!
//! This crate keeps a client connected to a backend notifications hub and
//! fans incoming notifications out to three user-facing surfaces: audio
//! cues, in-app toasts, and native desktop notifications. It is designed to
//! be embedded by a desktop shell and by the standalone headless notifier.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`connection`]: WebSocket session to the notifications hub, with
//!   automatic reconnection
//! - [`dispatch`]: duplicate suppression between the raw stream and
//!   delivery listeners
//! - [`channels`]: the delivery surfaces (sound, toast, desktop)
//! - [`prefs`]: persisted user preferences gating every surface
//! - [`events`]: event system for real-time UI communication
//! - [`platform`]: capability traits shells implement per host
//! - [`bootstrap`]: composition root wiring everything together
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple core logic from
//! platform-specific implementations:
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning background tasks
//! - [`EventEmitter`](events::EventEmitter): emitting domain events
//! - [`TokenProvider`](connection::TokenProvider): hub authentication
//! - [`KeyValueStore`](platform::KeyValueStore): preference persistence
//! - [`AudioSink`](platform::AudioSink): cue playback
//! - [`DesktopNotifier`](platform::DesktopNotifier): native notifications
//! - [`FocusProbe`](platform::FocusProbe): application focus
//!
//! Each trait has a headless implementation suitable for tests and the
//! standalone notifier; shells provide host-specific ones.

#![warn(clippy::all)]

pub mod bootstrap;
pub mod channels;
pub mod config;
pub mod connection;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod platform;
pub mod prefs;
pub mod runtime;
pub mod utils;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use error::{ChimeError, ChimeResult, ErrorCode};
pub use events::{
    ActionEvent, BroadcastEventBridge, ChimeEvent, ConnectionEvent, EventEmitter, ListenerId,
    NotificationEvent,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use utils::now_millis;

// Re-export connection types
pub use connection::{
    ConnectionManager, ConnectionOptions, ConnectionState, InboundMessage, ReconnectPolicy,
    StaticTokenProvider, TokenProvider,
};

// Re-export dispatch types
pub use dispatch::{DedupCache, DispatchCoordinator, DispatchStats, MessageFingerprint};

// Re-export channel types
pub use channels::{
    CloseReason, CueKind, DesktopNotificationChannel, SoundChannel, ToastChannel, ToastId,
    ToastPhase, ToastRequest, ToastSeverity,
};

// Re-export preference types
pub use prefs::{NotificationPreferences, PreferenceStore, ToastPosition};

// Re-export platform types
pub use platform::{AudioSink, DesktopNote, DesktopNotifier, FocusProbe, KeyValueStore, Permission};

// Re-export bootstrap types
pub use bootstrap::{
    bootstrap_services, bootstrap_services_with_platform, BootstrappedServices, PlatformAdapters,
};
