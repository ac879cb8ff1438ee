//! Connection manager for the lobby.
//!
//! [`LobbyClient`] owns at most one connection attempt at a time. Each call to
//! [`LobbyClient::connect`] installs a fresh [`Session`] and spawns a session
//! loop task that opens a transport through the [`Connector`], sends the
//! handshake, and then feeds every inbound frame to [`Session::receive`].
//! Events are emitted on a bounded channel returned from [`LobbyClient::new`].
//!
//! # Example
//!
//! ```rust,ignore
//! let (mut client, mut events) = LobbyClient::new(connector, LobbyConfig::default());
//! client.connect("Alice", None)?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         LobbyEvent::Joined { room_id, .. } => println!("share code {room_id}"),
//!         LobbyEvent::GameStarted(start) => { /* ... */ }
//!         LobbyEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{LobbyError, Result};
use crate::event::LobbyEvent;
use crate::protocol::{ClientMessage, JoinRequest};
use crate::session::{Phase, Session, SessionSnapshot};
use crate::transport::{Connector, Transport};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`LobbyClient`].
///
/// ```
/// use spyfall_client::LobbyConfig;
/// use std::time::Duration;
///
/// let config = LobbyConfig::new()
///     .with_event_channel_capacity(16)
///     .with_shutdown_timeout(Duration::from_millis(250));
/// assert_eq!(config.event_channel_capacity, 16);
/// ```
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, events are dropped with a warning so the
    /// session loop never blocks. `Disconnected` is always delivered.
    ///
    /// Defaults to **64**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`LobbyClient::shutdown`] waits for the session loop to close
    /// the transport before aborting it. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl LobbyConfig {
    pub fn new() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the capacity of the bounded event channel (clamped to at least 1).
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// The session of one connection attempt, shared with its loop task.
///
/// Once retired, the loop can neither mutate the session nor emit events,
/// so a superseded attempt cannot leak into the next one.
struct SessionCell {
    session: Mutex<Session>,
    retired: AtomicBool,
}

impl SessionCell {
    fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
            retired: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the live session; `None` if this attempt was retired.
    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut session = self.lock();
        if self.is_retired() {
            return None;
        }
        Some(f(&mut session))
    }

    fn retire(&self) {
        // Taking the lock waits out any update already in progress.
        let _session = self.lock();
        self.retired.store(true, Ordering::Release);
    }

    fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

/// Handles to the session loop task of the current attempt.
struct Attempt {
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    task: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

// ── Client handle ───────────────────────────────────────────────────

/// Joins or creates a room and tracks it until the game starts or the
/// connection ends.
///
/// Only one attempt is live at a time: [`connect`](Self::connect) discards
/// the previous one (dropping its transport) before starting the next.
/// A closed connection is never retried automatically.
pub struct LobbyClient<C: Connector> {
    connector: Arc<C>,
    config: LobbyConfig,
    event_tx: mpsc::Sender<LobbyEvent>,
    cell: Arc<SessionCell>,
    attempt: Option<Attempt>,
}

impl<C: Connector> LobbyClient<C> {
    /// Create an idle client and the receiver its events are delivered on.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn new(connector: C, config: LobbyConfig) -> (Self, mpsc::Receiver<LobbyEvent>) {
        // tokio panics on a zero capacity.
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let client = Self {
            connector: Arc::new(connector),
            config,
            event_tx,
            cell: Arc::new(SessionCell::new(Session::new())),
            attempt: None,
        };
        (client, event_rx)
    }

    /// Start a connection attempt as `display_name`.
    ///
    /// `room` is the code typed by the user; `None` (or a blank code) creates a
    /// new room. The outcome arrives asynchronously as [`LobbyEvent::Joined`]
    /// or [`LobbyEvent::JoinFailed`].
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::EmptyDisplayName`] if the name is blank. The
    /// current attempt, if any, is left untouched in that case.
    pub fn connect(&mut self, display_name: impl Into<String>, room: Option<&str>) -> Result<()> {
        let display_name = display_name.into().trim().to_string();
        if display_name.is_empty() {
            return Err(LobbyError::EmptyDisplayName);
        }

        self.discard_attempt();

        let request = JoinRequest::new(display_name.clone(), room);
        info!(
            name = %request.name,
            room = ?request.room,
            "connecting ({})",
            if request.creates_room() { "create" } else { "join" }
        );

        let cell = Arc::new(SessionCell::new(Session::connecting(display_name)));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(session_loop(
            Arc::clone(&self.connector),
            request,
            cmd_rx,
            self.event_tx.clone(),
            Arc::clone(&cell),
            shutdown_rx,
        ));

        self.cell = cell;
        self.attempt = Some(Attempt {
            cmd_tx,
            task,
            shutdown_tx: Some(shutdown_tx),
        });
        Ok(())
    }

    /// Ask the server to start the game.
    ///
    /// Local state is unchanged; the answer is either
    /// [`LobbyEvent::GameStarted`] or [`LobbyEvent::StartRejected`].
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::NotInLobby`] unless the session is `InLobby`.
    pub fn start(&self) -> Result<()> {
        self.send_when(ClientMessage::Start, |phase| phase == Phase::InLobby)
    }

    /// Leave the room.
    ///
    /// No acknowledgment is awaited: the server closes the connection, and
    /// that close resets the session to `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::NotInLobby`] unless the session is `InLobby` or
    /// `InGame`.
    pub fn leave(&self) -> Result<()> {
        self.send_when(ClientMessage::Leave, Phase::has_room)
    }

    /// Close the current connection, if any, and return to a fresh `Idle`
    /// session.
    ///
    /// The session loop gets [`LobbyConfig::shutdown_timeout`] to close the
    /// transport and emit its final `Disconnected` event; after that it is
    /// aborted.
    pub async fn shutdown(&mut self) {
        debug!("LobbyClient: shutdown requested");

        if let Some(mut attempt) = self.attempt.take() {
            if let Some(tx) = attempt.shutdown_tx.take() {
                let _ = tx.send(());
            }

            match tokio::time::timeout(self.config.shutdown_timeout, &mut attempt.task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    attempt.task.abort();
                    if let Err(join_err) = (&mut attempt.task).await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }

        self.cell.retire();
        self.cell = Arc::new(SessionCell::new(Session::new()));
    }

    // ── State accessors ─────────────────────────────────────────────

    /// A copy of the current session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.cell.lock().snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.cell.lock().phase()
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn send_when(&self, msg: ClientMessage, allowed: impl Fn(Phase) -> bool) -> Result<()> {
        let phase = self.phase();
        if !allowed(phase) {
            debug!(%phase, ?msg, "refusing lobby action");
            return Err(LobbyError::NotInLobby);
        }
        let attempt = self.attempt.as_ref().ok_or(LobbyError::NotInLobby)?;
        attempt
            .cmd_tx
            .send(msg)
            .map_err(|_| LobbyError::NotInLobby)
    }

    fn discard_attempt(&mut self) {
        self.cell.retire();
        if let Some(attempt) = self.attempt.take() {
            debug!("discarding previous connection attempt");
            attempt.task.abort();
        }
    }
}

impl<C: Connector> std::fmt::Debug for LobbyClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyClient")
            .field("phase", &self.phase())
            .field("has_task", &self.attempt.is_some())
            .finish()
    }
}

impl<C: Connector> Drop for LobbyClient<C> {
    fn drop(&mut self) {
        // No executor here to drive a graceful close; aborting drops the
        // transport with the task.
        self.discard_attempt();
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Drives one connection attempt from transport open to close.
///
/// Exits when the server closes the connection, the transport fails, the
/// handshake is rejected, or shutdown is requested. Every exit emits exactly
/// one `Disconnected` event (unless the attempt was retired).
async fn session_loop<C: Connector>(
    connector: Arc<C>,
    request: JoinRequest,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    event_tx: mpsc::Sender<LobbyEvent>,
    cell: Arc<SessionCell>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("session loop started");

    let opened = tokio::select! {
        opened = connector.open() => opened,
        _ = &mut shutdown_rx => {
            finish(&event_tx, &cell, Some("client shut down".into())).await;
            return;
        }
    };
    let mut transport = match opened {
        Ok(transport) => transport,
        Err(e) => {
            error!("failed to open transport: {e}");
            finish(&event_tx, &cell, Some(format!("failed to connect: {e}"))).await;
            return;
        }
    };

    if let Err(e) = send_handshake(&mut transport, &request).await {
        error!("failed to send handshake: {e}");
        let _ = transport.close().await;
        finish(&event_tx, &cell, Some(format!("handshake send error: {e}"))).await;
        return;
    }
    emit_event(&event_tx, &cell, LobbyEvent::Connected);

    let reason = loop {
        tokio::select! {
            // Branch 1: outgoing notification from the client handle
            cmd = cmd_rx.recv() => {
                let Some(msg) = cmd else {
                    debug!("command channel closed");
                    let _ = transport.close().await;
                    break Some("client shut down".to_string());
                };
                debug!(?msg, "sending lobby notification");
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("failed to serialize {msg:?}: {e}");
                        continue;
                    }
                };
                if let Err(e) = transport.send(json).await {
                    error!("transport send error: {e}");
                    break Some(format!("transport send error: {e}"));
                }
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                break Some("client shut down".to_string());
            }

            // Branch 3: inbound frame from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        let Some(step) = cell.update(|session| session.receive(&text)) else {
                            debug!("attempt retired, leaving session loop");
                            return;
                        };
                        if let Some(event) = step.event {
                            emit_event(&event_tx, &cell, event);
                        }
                        if step.hang_up {
                            let _ = transport.close().await;
                            break Some("join rejected".to_string());
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        break Some(format!("transport receive error: {e}"));
                    }
                    None => {
                        debug!("connection closed by server");
                        break None;
                    }
                }
            }
        }
    };

    finish(&event_tx, &cell, reason).await;
    debug!("session loop exited");
}

async fn send_handshake(transport: &mut impl Transport, request: &JoinRequest) -> Result<()> {
    let json = serde_json::to_string(request)?;
    transport.send(json).await?;
    debug!(room = ?request.room, "handshake sent");
    Ok(())
}

/// Emit an event without blocking. If the channel is full the event is
/// dropped with a warning.
fn emit_event(event_tx: &mpsc::Sender<LobbyEvent>, cell: &SessionCell, event: LobbyEvent) {
    if cell.is_retired() {
        return;
    }
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Apply the close transition and emit the final `Disconnected` event.
///
/// Uses `send().await` because this is the last event of the attempt and
/// must not be dropped.
async fn finish(event_tx: &mpsc::Sender<LobbyEvent>, cell: &SessionCell, reason: Option<String>) {
    if cell.update(Session::transport_closed).is_none() {
        return;
    }
    if event_tx
        .send(LobbyEvent::Disconnected { reason })
        .await
        .is_err()
    {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Opens transports that accept sends, never deliver a frame, and hang
    /// forever in `close()`.
    struct HangingConnector {
        close_called: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    struct HangingCloseTransport {
        close_called: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    impl Drop for HangingCloseTransport {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::Release);
        }
    }

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), LobbyError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, LobbyError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), LobbyError> {
            self.close_called.store(true, Ordering::Release);
            std::future::pending().await
        }
    }

    #[async_trait]
    impl Connector for HangingConnector {
        type Transport = HangingCloseTransport;

        async fn open(&self) -> std::result::Result<HangingCloseTransport, LobbyError> {
            Ok(HangingCloseTransport {
                close_called: Arc::clone(&self.close_called),
                dropped: Arc::clone(&self.dropped),
            })
        }
    }

    fn hanging_connector() -> (HangingConnector, Arc<AtomicBool>, Arc<AtomicBool>) {
        let close_called = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicBool::new(false));
        let connector = HangingConnector {
            close_called: Arc::clone(&close_called),
            dropped: Arc::clone(&dropped),
        };
        (connector, close_called, dropped)
    }

    #[test]
    fn config_defaults() {
        let config = LobbyConfig::default();
        assert_eq!(config.event_channel_capacity, 64);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        let config = LobbyConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[tokio::test]
    async fn zero_capacity_set_directly_does_not_panic() {
        let (connector, _, _) = hanging_connector();
        let config = LobbyConfig {
            event_channel_capacity: 0,
            shutdown_timeout: Duration::from_millis(20),
        };
        let (mut client, mut events) = LobbyClient::new(connector, config);
        client.connect("Alice", None).unwrap();
        assert_eq!(events.recv().await.unwrap(), LobbyEvent::Connected);
        client.shutdown().await;
    }

    #[test]
    fn retired_cell_rejects_updates() {
        let cell = SessionCell::new(Session::connecting("Alice"));
        assert!(cell.update(|s| s.phase()).is_some());
        cell.retire();
        assert!(cell.update(|s| s.phase()).is_none());
        // Reads still work for the handle.
        assert_eq!(cell.lock().phase(), Phase::Connecting);
    }

    #[tokio::test]
    async fn shutdown_timeout_aborts_stuck_session_loop() {
        let (connector, close_called, dropped) = hanging_connector();
        let config = LobbyConfig::new().with_shutdown_timeout(Duration::from_millis(20));
        let (mut client, mut events) = LobbyClient::new(connector, config);

        client.connect("Alice", None).unwrap();
        assert_eq!(events.recv().await.unwrap(), LobbyEvent::Connected);
        assert_eq!(client.phase(), Phase::Connecting);

        client.shutdown().await;

        assert!(
            close_called.load(Ordering::Acquire),
            "transport.close() should have been attempted during graceful shutdown"
        );
        assert!(
            dropped.load(Ordering::Acquire),
            "timed-out shutdown should abort and drop the session loop task"
        );
        assert_eq!(client.snapshot(), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn reconnect_drops_previous_transport() {
        let (connector, close_called, dropped) = hanging_connector();
        let (mut client, mut events) = LobbyClient::new(connector, LobbyConfig::default());

        client.connect("Alice", None).unwrap();
        assert_eq!(events.recv().await.unwrap(), LobbyEvent::Connected);

        client.connect("Alice", Some("abcd")).unwrap();
        assert_eq!(events.recv().await.unwrap(), LobbyEvent::Connected);
        // Let the runtime reap the aborted task.
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The first attempt was aborted, not gracefully closed.
        assert!(dropped.load(Ordering::Acquire));
        assert!(!close_called.load(Ordering::Acquire));
        assert_eq!(client.phase(), Phase::Connecting);
    }

    #[tokio::test]
    async fn debug_output_reports_phase() {
        let (connector, _, _) = hanging_connector();
        let (client, _events) = LobbyClient::new(connector, LobbyConfig::default());
        let rendered = format!("{client:?}");
        assert!(rendered.contains("Idle"), "{rendered}");
    }
}
