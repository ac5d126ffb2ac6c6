//! WebSocket connection management for the notifications hub.
//!
//! [`ConnectionManager`] owns one hub session at a time. It derives the hub
//! endpoint from the configured API base URL, performs the authenticated
//! upgrade, then hands the socket to a background session task that
//! multiplexes outbound invocations, keepalive pings, and inbound frames.
//! When an established session drops, the task reconnects on a fixed backoff
//! schedule; once the schedule is exhausted it gives up and the connection
//! settles at [`ConnectionState::Disconnected`].

mod backoff;
mod endpoint;
mod wire;

pub use backoff::ReconnectPolicy;
pub use endpoint::HubEndpoint;
pub use wire::{ClientInvocation, InboundMessage, ServerMessage};

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::constants::{COMMAND_CHANNEL_CAPACITY, KEEPALIVE_INTERVAL_SECS};
use crate::events::{ConnectionEvent, EventEmitter, ListenerId, ListenerRegistry};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::utils::now_millis;

/// Errors from establishing a hub connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The configured API base URL could not be turned into a hub endpoint.
    #[error("Invalid hub endpoint: {0}")]
    InvalidEndpoint(String),

    /// The WebSocket upgrade was refused or the host is unreachable.
    #[error("Hub handshake failed: {0}")]
    Handshake(String),
}

/// Result type for connection operations.
pub type ConnectResult<T> = Result<T, ConnectError>;

/// Lifecycle state of the hub connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    /// No session, none being established.
    Disconnected,
    /// First handshake in progress.
    Connecting,
    /// Session established.
    Connected,
    /// Session lost, reconnect schedule running.
    Reconnecting,
    /// Reconnect schedule exhausted. Published momentarily before the
    /// connection settles at [`ConnectionState::Disconnected`].
    Failed,
}

/// Supplies the access token for hub authentication.
///
/// `token` is called before every connection attempt, including each
/// reconnect, so a rotated token takes effect without a manual reconnect.
pub trait TokenProvider: Send + Sync {
    /// Returns the current access token.
    fn token(&self) -> String;
}

/// Token provider returning a fixed string.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(String);

impl StaticTokenProvider {
    /// Wraps a fixed token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticTokenProvider {
    fn token(&self) -> String {
        self.0.clone()
    }
}

/// Tunables for the connection manager.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Reconnect schedule applied after an established session drops.
    pub reconnect: ReconnectPolicy,
    /// Gap between keepalive pings on an idle session.
    pub keepalive_interval: Duration,
    /// Outbound invocation queue depth.
    pub command_capacity: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            keepalive_interval: Duration::from_secs(KEEPALIVE_INTERVAL_SECS),
            command_capacity: COMMAND_CHANNEL_CAPACITY,
        }
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// State shared between the manager handle and the session task.
struct ConnectionShared {
    endpoint: HubEndpoint,
    options: ConnectionOptions,
    state_tx: watch::Sender<ConnectionState>,
    listeners: ListenerRegistry<InboundMessage>,
    /// Groups the hub has acknowledged for the current session.
    groups: DashSet<String>,
    emitter: Arc<dyn EventEmitter>,
    token_provider: RwLock<Option<Arc<dyn TokenProvider>>>,
    command_tx: RwLock<Option<mpsc::Sender<ClientInvocation>>>,
}

impl ConnectionShared {
    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state();
        if previous == next {
            return;
        }
        log::debug!("[Connection] {:?} -> {:?}", previous, next);
        self.state_tx.send_replace(next);
        self.emitter.emit_connection(ConnectionEvent::StateChanged {
            previous,
            current: next,
            timestamp: now_millis(),
        });
    }

    /// Queues an invocation for the session task. Dropped with a debug log
    /// when no session is active.
    async fn send(&self, invocation: ClientInvocation) {
        // Clone the sender out before awaiting; the lock must not be held
        // across the send.
        let sender = self.command_tx.read().clone();
        let Some(sender) = sender else {
            log::debug!("[Connection] No active session, dropped {:?}", invocation);
            return;
        };
        if sender.send(invocation).await.is_err() {
            log::debug!("[Connection] Session task gone, invocation dropped");
        }
    }
}

/// Manages the WebSocket session to the notifications hub.
pub struct ConnectionManager {
    shared: Arc<ConnectionShared>,
    spawner: TokioSpawner,
    session_cancel: parking_lot::Mutex<CancellationToken>,
    /// Serializes concurrent `connect` callers.
    connect_gate: tokio::sync::Mutex<()>,
}

impl ConnectionManager {
    /// Creates a manager for the hub behind `api_base_url`.
    ///
    /// Purely local: no network traffic until [`connect`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidEndpoint`] if the URL cannot be turned
    /// into a hub endpoint.
    ///
    /// [`connect`]: ConnectionManager::connect
    pub fn new(
        api_base_url: &str,
        options: ConnectionOptions,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
    ) -> ConnectResult<Self> {
        let endpoint = HubEndpoint::resolve(api_base_url)?;
        let (state_tx, _state_rx) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            shared: Arc::new(ConnectionShared {
                endpoint,
                options,
                state_tx,
                listeners: ListenerRegistry::new("Connection"),
                groups: DashSet::new(),
                emitter,
                token_provider: RwLock::new(None),
                command_tx: RwLock::new(None),
            }),
            spawner,
            session_cancel: parking_lot::Mutex::new(CancellationToken::new()),
            connect_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// The derived hub endpoint URI.
    #[must_use]
    pub fn hub_uri(&self) -> &Uri {
        self.shared.endpoint.uri()
    }

    /// Establishes the hub session.
    ///
    /// No-op when already `Connected` or `Connecting`. On success the
    /// session task is running, the state is `Connected`, and an initial
    /// ping is queued.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Handshake`] if the upgrade fails; the state
    /// is `Disconnected` afterwards and no reconnection is scheduled. The
    /// failure is intentionally quiet in the logs since callers receive the
    /// error directly.
    pub async fn connect(&self, tokens: Arc<dyn TokenProvider>) -> ConnectResult<()> {
        let _gate = self.connect_gate.lock().await;

        match self.shared.state() {
            ConnectionState::Connected | ConnectionState::Connecting => return Ok(()),
            _ => {}
        }

        // A Reconnecting session still owns a cancel token. Kill it before
        // starting fresh so two session tasks never race over the state.
        self.session_cancel.lock().cancel();

        *self.shared.token_provider.write() = Some(Arc::clone(&tokens));
        self.shared.set_state(ConnectionState::Connecting);

        let request = self.shared.endpoint.request(&tokens.token());
        let socket = match connect_async(request).await {
            Ok((socket, _response)) => socket,
            Err(e) => {
                log::debug!("[Connection] Handshake failed: {}", e);
                self.shared.set_state(ConnectionState::Disconnected);
                return Err(ConnectError::Handshake(e.to_string()));
            }
        };

        let (command_tx, command_rx) = mpsc::channel(self.shared.options.command_capacity);
        *self.shared.command_tx.write() = Some(command_tx);

        let cancel = CancellationToken::new();
        *self.session_cancel.lock() = cancel.clone();

        self.shared.set_state(ConnectionState::Connected);
        log::info!("[Connection] Connected to {}", self.shared.endpoint.uri());

        self.spawner
            .spawn(session_loop(Arc::clone(&self.shared), socket, command_rx, cancel));

        self.shared.send(ClientInvocation::Ping).await;
        Ok(())
    }

    /// Tears down the session and settles at `Disconnected`.
    ///
    /// Idempotent; also cancels an in-flight reconnect schedule.
    pub fn disconnect(&self) {
        self.session_cancel.lock().cancel();
        *self.shared.command_tx.write() = None;
        self.shared.groups.clear();
        self.shared.set_state(ConnectionState::Disconnected);
    }

    /// Asks the hub to add this session to `group`.
    ///
    /// Fire-and-forget: dropped with a debug log when not connected.
    /// Membership is confirmed once the hub acknowledges, see
    /// [`confirmed_groups`].
    ///
    /// [`confirmed_groups`]: ConnectionManager::confirmed_groups
    pub async fn join_group(&self, group: impl Into<String>) {
        let group = group.into();
        if self.shared.state() != ConnectionState::Connected {
            log::debug!("[Connection] Not connected, dropped join for '{}'", group);
            return;
        }
        self.shared.send(ClientInvocation::JoinGroup { group }).await;
    }

    /// Asks the hub to remove this session from `group`. Fire-and-forget.
    pub async fn leave_group(&self, group: impl Into<String>) {
        let group = group.into();
        if self.shared.state() != ConnectionState::Connected {
            log::debug!("[Connection] Not connected, dropped leave for '{}'", group);
            return;
        }
        self.shared.send(ClientInvocation::LeaveGroup { group }).await;
    }

    /// Sends a keepalive ping outside the regular schedule.
    pub async fn ping(&self) {
        if self.shared.state() != ConnectionState::Connected {
            return;
        }
        self.shared.send(ClientInvocation::Ping).await;
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Watch receiver over state changes.
    ///
    /// Rapid transitions coalesce; a receiver is only guaranteed to observe
    /// the latest state, not every intermediate one.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// State changes as a [`Stream`](futures::Stream).
    #[must_use]
    pub fn state_stream(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.state_changes())
    }

    /// Groups the hub has acknowledged for the current session.
    ///
    /// Cleared when the session drops. Not restored by reconnection;
    /// callers re-join on the `Reconnecting` to `Connected` transition.
    #[must_use]
    pub fn confirmed_groups(&self) -> Vec<String> {
        self.shared
            .groups
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Registers a callback for every inbound notification, pre-dedup.
    pub fn add_listener(
        &self,
        listener: impl Fn(&InboundMessage) + Send + Sync + 'static,
    ) -> ListenerId {
        self.shared.listeners.add(listener)
    }

    /// Removes a notification listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.session_cancel.lock().cancel();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.shared.endpoint.uri().to_string())
            .field("state", &self.shared.state())
            .finish()
    }
}

async fn send_frame(sink: &mut WsSink, invocation: &ClientInvocation) -> Result<(), String> {
    let text =
        serde_json::to_string(invocation).map_err(|e| format!("encode failed: {e}"))?;
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| format!("send failed: {e}"))
}

/// Drives one hub session, reconnecting across socket generations.
///
/// Owns the socket. Exits on cancellation, when the command channel closes,
/// or when the reconnect schedule is exhausted.
async fn session_loop(
    shared: Arc<ConnectionShared>,
    socket: WsStream,
    mut command_rx: mpsc::Receiver<ClientInvocation>,
    cancel: CancellationToken,
) {
    let mut socket = socket;
    'session: loop {
        let (mut sink, mut stream) = socket.split();

        // First tick one full period out. connect() already queued the
        // post-handshake ping, an immediate tick would duplicate it.
        let mut keepalive = interval_at(
            Instant::now() + shared.options.keepalive_interval,
            shared.options.keepalive_interval,
        );
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let drop_reason = loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
                command = command_rx.recv() => {
                    let Some(invocation) = command else { return };
                    if let Err(reason) = send_frame(&mut sink, &invocation).await {
                        break reason;
                    }
                }
                _ = keepalive.tick() => {
                    if let Err(reason) = send_frame(&mut sink, &ClientInvocation::Ping).await {
                        break reason;
                    }
                }
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => handle_frame(&shared, &text),
                        Some(Ok(Message::Close(_))) => break "closed by hub".to_string(),
                        // Binary and transport ping/pong frames are not part
                        // of the hub protocol.
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break format!("transport error: {e}"),
                        None => break "stream ended".to_string(),
                    }
                }
            }
        };

        log::warn!("[Connection] Session dropped ({}), reconnecting", drop_reason);
        // The hub forgot this session's memberships along with the session.
        shared.groups.clear();
        shared.set_state(ConnectionState::Reconnecting);

        match run_reconnect(&shared, &cancel).await {
            Some(new_socket) => {
                socket = new_socket;
                shared.set_state(ConnectionState::Connected);
                log::info!("[Connection] Reconnected to {}", shared.endpoint.uri());
                shared.send(ClientInvocation::Ping).await;
                // Memberships are not restored. Callers that need their
                // groups back re-join on the Reconnecting -> Connected
                // transition.
                continue 'session;
            }
            None => {
                if cancel.is_cancelled() {
                    return;
                }
                log::warn!(
                    "[Connection] Gave up after {} reconnect attempts",
                    shared.options.reconnect.attempts()
                );
                shared.set_state(ConnectionState::Failed);
                *shared.command_tx.write() = None;
                shared.set_state(ConnectionState::Disconnected);
                return;
            }
        }
    }
}

fn handle_frame(shared: &ConnectionShared, text: &str) {
    let message = match serde_json::from_str::<ServerMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            log::debug!("[Connection] Skipped undecodable frame: {}", e);
            return;
        }
    };
    match message {
        ServerMessage::Connected => log::debug!("[Connection] Hub acknowledged the session"),
        ServerMessage::Pong => log::trace!("[Connection] Pong"),
        ServerMessage::JoinedGroup { group } => {
            log::debug!("[Connection] Joined group '{}'", group);
            shared.groups.insert(group);
        }
        ServerMessage::LeftGroup { group } => {
            log::debug!("[Connection] Left group '{}'", group);
            shared.groups.remove(&group);
        }
        ServerMessage::Notification {
            event_type,
            data,
            timestamp,
        } => {
            shared.listeners.emit(&InboundMessage {
                event_type,
                data,
                timestamp,
            });
        }
    }
}

/// Walks the reconnect schedule until a handshake succeeds.
///
/// Returns `None` when the schedule is exhausted, the token provider is
/// gone, or `cancel` fires mid-wait.
async fn run_reconnect(
    shared: &Arc<ConnectionShared>,
    cancel: &CancellationToken,
) -> Option<WsStream> {
    let policy = &shared.options.reconnect;
    for attempt in 0..policy.attempts() {
        let delay = policy.delay(attempt);
        if delay.is_zero() {
            if cancel.is_cancelled() {
                return None;
            }
        } else {
            tokio::select! {
                () = cancel.cancelled() => return None,
                () = tokio::time::sleep(delay) => {}
            }
        }

        // Token re-read per attempt so a rotation is picked up.
        let provider = shared.token_provider.read().clone();
        let provider = provider?;
        let request = shared.endpoint.request(&provider.token());

        match connect_async(request).await {
            Ok((socket, _response)) => return Some(socket),
            Err(e) => log::debug!(
                "[Connection] Reconnect attempt {}/{} failed: {}",
                attempt + 1,
                policy.attempts(),
                e
            ),
        }
    }
    None
}
