#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for lobby client integration tests.
//!
//! Provides a channel-driven [`MockTransport`] with a [`MockServer`] handle
//! for pushing frames one at a time, a [`MockConnector`] that hands out
//! prepared transports, and helpers for building server frames.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use spyfall_client::protocol::{Assignment, BrokerMessage, Connected, GameStart, JoinErr, JoinResponse};
use spyfall_client::{Connector, LobbyError, Transport};
use tokio::sync::mpsc;

type Incoming = Option<Result<String, LobbyError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// Transport whose inbound frames are pushed by a [`MockServer`].
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Incoming>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

/// Test-side handle of a [`MockTransport`].
#[derive(Clone)]
pub struct MockServer {
    tx: mpsc::UnboundedSender<Incoming>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

/// Create a transport plus the handle that drives it.
pub fn mock_transport() -> (MockTransport, MockServer) {
    let (tx, incoming) = mpsc::unbounded_channel();
    let sent = Arc::new(StdMutex::new(Vec::new()));
    let closed = Arc::new(AtomicBool::new(false));
    let transport = MockTransport {
        incoming,
        sent: Arc::clone(&sent),
        closed: Arc::clone(&closed),
    };
    let server = MockServer { tx, sent, closed };
    (transport, server)
}

impl MockServer {
    /// Deliver a text frame to the client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.tx.send(Some(Ok(frame.into())));
    }

    /// Fail the client's next `recv` with a transport error.
    pub fn push_error(&self, message: &str) {
        let _ = self
            .tx
            .send(Some(Err(LobbyError::TransportReceive(message.into()))));
    }

    /// Close the connection from the server side.
    pub fn hang_up(&self) {
        let _ = self.tx.send(None);
    }

    /// Frames the client has sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Frames the client has sent, parsed as JSON.
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|frame| serde_json::from_str(frame).expect("client sent invalid JSON"))
            .collect()
    }

    /// Whether the client called `close()`.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), LobbyError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LobbyError::TransportClosed);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, LobbyError>> {
        match self.incoming.recv().await {
            Some(item) => item,
            // Every server handle dropped: stay open until the client acts.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), LobbyError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Hands out prepared transports in order, then refuses connections.
pub struct MockConnector {
    transports: StdMutex<VecDeque<MockTransport>>,
    opened: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new(transports: Vec<MockTransport>) -> Self {
        Self {
            transports: StdMutex::new(VecDeque::from(transports)),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of successful `open` calls, readable after the connector has
    /// been moved into a client.
    pub fn opened(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.opened)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn open(&self) -> Result<MockTransport, LobbyError> {
        let next = self.transports.lock().unwrap().pop_front();
        match next {
            Some(transport) => {
                self.opened.fetch_add(1, Ordering::AcqRel);
                Ok(transport)
            }
            None => Err(LobbyError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no scripted transport left",
            ))),
        }
    }
}

// ── Frame helpers ───────────────────────────────────────────────────

pub fn handshake_ok_json(room_id: &str, players: &[&str]) -> String {
    serde_json::to_string(&JoinResponse::Ok(Connected {
        room_id: room_id.into(),
        players: players.iter().map(|p| p.to_string()).collect(),
    }))
    .expect("handshake_ok_json serialization")
}

pub fn handshake_err_json(err: JoinErr) -> String {
    serde_json::to_string(&JoinResponse::Err(err)).expect("handshake_err_json serialization")
}

pub fn join_json(name: &str) -> String {
    serde_json::to_string(&BrokerMessage::Join(name.into())).expect("join_json serialization")
}

pub fn left_json(name: &str) -> String {
    serde_json::to_string(&BrokerMessage::Left(name.into())).expect("left_json serialization")
}

pub fn not_enough_players_json() -> String {
    serde_json::to_string(&BrokerMessage::NotEnoughPlayers)
        .expect("not_enough_players_json serialization")
}

/// `assignment` of `None` makes the receiving player the spy.
pub fn started_json(first: &str, assignment: Option<(&str, &str)>) -> String {
    serde_json::to_string(&BrokerMessage::Started(game_start(first, assignment)))
        .expect("started_json serialization")
}

pub fn game_start(first: &str, assignment: Option<(&str, &str)>) -> GameStart {
    GameStart {
        first: first.into(),
        assignment: assignment.map(|(location, role)| Assignment {
            location: location.into(),
            role: role.into(),
        }),
    }
}
