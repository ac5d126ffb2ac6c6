//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. This pattern provides:
//!
//! - **Clarity**: All dependency relationships are visible in one place
//! - **Testability**: Easy to swap implementations for testing
//! - **Maintainability**: Service creation logic is isolated from usage

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::channels::{DesktopNotificationChannel, SoundChannel, ToastChannel};
use crate::config::Config;
use crate::connection::{ConnectionManager, ConnectionOptions, ReconnectPolicy};
use crate::dispatch::DispatchCoordinator;
use crate::error::{ChimeError, ChimeResult};
use crate::events::{BroadcastEventBridge, ChimeEvent, EventEmitter};
use crate::platform::{
    AudioSink, DesktopNotifier, FileKeyValueStore, FocusProbe, KeyValueStore, MemoryKeyValueStore,
    NoopDesktopNotifier, NullAudioSink, StaticFocusProbe,
};
use crate::prefs::PreferenceStore;
use crate::runtime::TokioSpawner;

/// Platform capabilities injected into the core.
///
/// Shipping shells construct this with real adapters (OS notifications, an
/// audio device, the window system). [`PlatformAdapters::headless`] builds
/// the all-stub variant for tests and server-side embeddings.
pub struct PlatformAdapters {
    /// Preference persistence.
    pub storage: Arc<dyn KeyValueStore>,
    /// Audio cue output.
    pub audio: Arc<dyn AudioSink>,
    /// Native notification posting.
    pub desktop: Arc<dyn DesktopNotifier>,
    /// Application focus queries.
    pub focus: Arc<dyn FocusProbe>,
}

impl PlatformAdapters {
    /// Adapters that need no OS facilities.
    ///
    /// Storage is file-backed when the config names a data directory and
    /// in-memory otherwise; audio, desktop, and focus are stubs.
    #[must_use]
    pub fn headless(config: &Config) -> Self {
        let storage: Arc<dyn KeyValueStore> = match &config.data_dir {
            Some(dir) => Arc::new(FileKeyValueStore::new(dir)),
            None => Arc::new(MemoryKeyValueStore::new()),
        };
        Self {
            storage,
            audio: Arc::new(NullAudioSink),
            desktop: Arc::new(NoopDesktopNotifier),
            focus: Arc::new(StaticFocusProbe::unfocused()),
        }
    }
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// User notification preferences.
    pub preferences: Arc<PreferenceStore>,
    /// Audio cue channel.
    pub sounds: Arc<SoundChannel>,
    /// In-app toast queue.
    pub toasts: Arc<ToastChannel>,
    /// Native desktop notification channel.
    pub desktop: Arc<DesktopNotificationChannel>,
    /// Hub connection manager.
    pub connection: Arc<ConnectionManager>,
    /// De-duplicating dispatcher over the connection.
    pub dispatch: Arc<DispatchCoordinator>,
    /// Broadcast channel sender for real-time events.
    pub broadcast_tx: broadcast::Sender<ChimeEvent>,
    /// Event bridge for emitting events to UI subscribers and optional
    /// external consumers.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Signal cancellation to all background tasks
        self.cancel_token.cancel();

        // Tear down the hub session
        self.connection.disconnect();

        // Drop queued toasts
        let toasts_dropped = self.toasts.len();
        self.toasts.clear();
        if toasts_dropped > 0 {
            log::info!("[Bootstrap] Dropped {} queued toast(s)", toasts_dropped);
        }

        // Release the audio output
        self.sounds.dispose();

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all services with headless platform adapters.
///
/// Convenience wrapper around [`bootstrap_services_with_platform`]; see
/// there for the wiring order.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn bootstrap_services(config: &Config) -> ChimeResult<BootstrappedServices> {
    bootstrap_services_with_platform(config, PlatformAdapters::headless(config))
}

/// Bootstraps all application services with their dependencies.
///
/// This is the composition root where all services are instantiated and
/// wired together. The wiring order matters - services are created in
/// dependency order:
///
/// 1. Shared infrastructure (spawner, broadcast channel, event bridge,
///    cancellation token)
/// 2. Preference store (hydrates synchronously from storage)
/// 3. Delivery channels (sound, toast, desktop), each gated by its own
///    preference flag
/// 4. Connection manager (depends on config and event bridge)
/// 5. Dispatch coordinator (attaches to the connection's raw stream)
///
/// # Errors
///
/// Returns an error if the configuration fails validation or the API base
/// URL cannot be turned into a hub endpoint.
pub fn bootstrap_services_with_platform(
    config: &Config,
    platform: PlatformAdapters,
) -> ChimeResult<BootstrappedServices> {
    config.validate().map_err(ChimeError::Configuration)?;

    // Create task spawner from current runtime
    let spawner = TokioSpawner::current();

    // Create broadcast channel for real-time events to UI subscribers
    let (broadcast_tx, _) = broadcast::channel::<ChimeEvent>(config.event_channel_capacity);

    // Create the event bridge that maps domain events to broadcast transport
    let event_bridge = Arc::new(BroadcastEventBridge::with_sender(broadcast_tx.clone()));

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Preference store hydrates from storage before anything consults it
    let preferences = Arc::new(PreferenceStore::new(Arc::clone(&platform.storage)));

    // Wire up the delivery channels
    let sounds = Arc::new(SoundChannel::new(
        Arc::clone(&preferences),
        Arc::clone(&platform.audio),
    ));
    let toasts = Arc::new(ToastChannel::new(
        Arc::clone(&preferences),
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        spawner.clone(),
    ));
    let desktop = Arc::new(DesktopNotificationChannel::new(
        Arc::clone(&preferences),
        Arc::clone(&platform.desktop),
        Arc::clone(&platform.focus),
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        spawner.clone(),
    ));

    // Wire up the hub connection
    let options = ConnectionOptions {
        reconnect: ReconnectPolicy::default(),
        keepalive_interval: Duration::from_secs(config.keepalive_interval_secs),
        command_capacity: config.command_channel_capacity,
    };
    let connection = Arc::new(ConnectionManager::new(
        &config.api_base_url,
        options,
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        spawner.clone(),
    )?);

    // Dispatch sits between the raw stream and delivery listeners
    let dispatch = Arc::new(DispatchCoordinator::attach(
        Arc::clone(&connection),
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
    ));

    Ok(BootstrappedServices {
        preferences,
        sounds,
        toasts,
        desktop,
        connection,
        dispatch,
        broadcast_tx,
        event_bridge,
        spawner,
        cancel_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionState;

    #[tokio::test]
    async fn bootstrap_wires_a_headless_stack() {
        let config = Config::new("http://localhost:5000/api/v1");
        let services = bootstrap_services(&config).expect("bootstrap succeeds");

        assert_eq!(services.connection.state(), ConnectionState::Disconnected);
        assert!(services.toasts.is_empty());
        assert!(services.sounds.is_enabled(), "sounds default on");
        assert_eq!(
            services.connection.hub_uri().to_string(),
            "ws://localhost:5000/hubs/notifications"
        );

        services.shutdown().await;
        assert!(services.cancel_token.is_cancelled());
    }

    #[tokio::test]
    async fn bootstrap_rejects_an_empty_base_url() {
        let config = Config::new("");
        assert!(matches!(
            bootstrap_services(&config),
            Err(ChimeError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn bootstrap_rejects_a_malformed_base_url() {
        let config = Config::new("ldap://example.com");
        assert!(matches!(
            bootstrap_services(&config),
            Err(ChimeError::Connection(_))
        ));
    }
}
