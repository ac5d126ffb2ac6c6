//! Chime Notifier - Standalone headless notifier for Chime.
//!
//! This binary subscribes to the portal's notifications hub the same way the
//! desktop shell does but without a GUI. Fresh notifications are mirrored to
//! the log and pushed through the delivery channels, which makes it useful as
//! a terminal companion and as an end-to-end probe of a portal deployment.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chime_core::{
    bootstrap_services, BootstrappedServices, ConnectionState, CueKind, DesktopNote,
    InboundMessage, StaticTokenProvider, TaskSpawner, ToastRequest, ToastSeverity,
};
use clap::Parser;
use serde_json::Value;
use tokio::signal;
use tokio::sync::broadcast;

use crate::config::NotifierConfig;

/// Chime Notifier - Headless real-time notification consumer.
#[derive(Parser, Debug)]
#[command(name = "chime-notifier")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "CHIME_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Portal API base URL (overrides config file).
    #[arg(short = 'u', long, env = "CHIME_API_BASE_URL")]
    api_url: Option<String>,

    /// Access token for the hub handshake (overrides config file).
    #[arg(short, long, env = "CHIME_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Notification group to join once connected (repeatable).
    #[arg(short, long = "group", value_name = "GROUP")]
    groups: Vec<String>,

    /// Data directory for persistent state (preference record).
    #[arg(short = 'd', long, env = "CHIME_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Chime Notifier v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        NotifierConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }
    if let Some(token) = args.token {
        config.access_token = Some(token);
    }
    if !args.groups.is_empty() {
        config.groups = args.groups;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }

    let Some(token) = config.access_token.clone() else {
        anyhow::bail!("No access token configured. Pass --token or set CHIME_ACCESS_TOKEN.");
    };

    log::info!(
        "Configuration: api_base_url={}, groups={:?}",
        config.api_base_url,
        config.groups
    );
    if let Some(ref data_dir) = config.data_dir {
        log::info!("Using data directory: {}", data_dir.display());
    } else {
        log::info!("No data directory configured - preferences will not persist");
    }

    // Bootstrap services on the headless platform adapters
    let core_config = config.to_core_config();
    let services = bootstrap_services(&core_config).context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    // Fan deduplicated notifications out to the delivery channels
    install_delivery(&services);

    // Mirror the event stream to the log for debugging
    spawn_event_mirror(&services);

    // Group membership is driven off the state watcher: the hub forgets
    // memberships when a session drops and the connection manager does not
    // restore them, so every transition into Connected re-issues the joins.
    spawn_group_watch(&services, config.groups.clone());

    services
        .connection
        .connect(Arc::new(StaticTokenProvider::new(token)))
        .await
        .context("Failed to connect to the notifications hub")?;

    log::info!("Connected to {}", services.connection.hub_uri());

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Graceful shutdown
    services.shutdown().await;

    log::info!("Shutdown complete");
    Ok(())
}

/// Registers the dispatch listener that drives the delivery channels.
///
/// Listeners run synchronously on the session task, so the actual channel
/// work is handed to a spawned task per notification.
fn install_delivery(services: &BootstrappedServices) {
    let delivery = services.clone();
    let spawner = services.spawner.clone();
    services.dispatch.add_listener(move |message| {
        let message = message.clone();
        let services = delivery.clone();
        spawner.spawn(async move {
            deliver(&services, message).await;
        });
    });
}

/// Renders one notification through the toast, sound, and desktop channels.
async fn deliver(services: &BootstrappedServices, message: InboundMessage) {
    log::info!("[Notifier] {} at {}", message.event_type, message.timestamp);

    let severity = severity_for(&message.event_type);
    let title = title_for(&message.event_type);
    let body = summary_for(&message);

    services
        .toasts
        .push(ToastRequest::new(severity, title.clone(), body.clone()));
    services.sounds.play(cue_for(severity));

    let note = DesktopNote::new(title, body)
        .with_tag(message.event_type.clone())
        .with_data(message.data.clone());
    services.desktop.show_if_not_focused(note).await;
}

/// Mirrors every bridged event to the debug log as JSON.
fn spawn_event_mirror(services: &BootstrappedServices) {
    let mut events = services.broadcast_tx.subscribe();
    let cancel = services.cancel_token.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = events.recv() => match received {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            log::debug!("[Events] {}", json);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("[Events] Lagged, {} event(s) dropped", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });
}

/// Joins the configured groups on every observed transition into `Connected`.
fn spawn_group_watch(services: &BootstrappedServices, groups: Vec<String>) {
    if groups.is_empty() {
        return;
    }
    let connection = Arc::clone(&services.connection);
    let cancel = services.cancel_token.clone();
    let mut states = connection.state_changes();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            if *states.borrow_and_update() != ConnectionState::Connected {
                continue;
            }
            for group in &groups {
                log::info!("[Notifier] Joining group '{}'", group);
                connection.join_group(group.clone()).await;
            }
        }
    });
}

fn severity_for(event_type: &str) -> ToastSeverity {
    if event_type.ends_with("_failed") || event_type.ends_with("_error") {
        ToastSeverity::Error
    } else if event_type.ends_with("_cancelled") || event_type.ends_with("_overdue") {
        ToastSeverity::Warning
    } else if event_type.ends_with("_confirmed") || event_type.ends_with("_completed") {
        ToastSeverity::Success
    } else {
        ToastSeverity::Info
    }
}

fn cue_for(severity: ToastSeverity) -> CueKind {
    match severity {
        ToastSeverity::Success => CueKind::Success,
        ToastSeverity::Error => CueKind::Error,
        ToastSeverity::Warning => CueKind::Warning,
        ToastSeverity::Info => CueKind::Info,
    }
}

/// `appointment_created` -> `Appointment created`.
fn title_for(event_type: &str) -> String {
    let spaced = event_type.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Notification".to_string(),
    }
}

/// Prefers a human-readable line from the payload, falls back to the
/// publisher timestamp.
fn summary_for(message: &InboundMessage) -> String {
    message
        .data
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Received at {}", message.timestamp))
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
