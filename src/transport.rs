//! Transport abstraction for the lobby protocol.
//!
//! The [`Transport`] trait is a bidirectional text frame channel between the
//! client and the room server. Frames are complete JSON documents, so every
//! implementation handles framing internally (WebSocket frames, length
//! prefixes, in-memory channels, ...).
//!
//! # Connection Setup
//!
//! A closed transport is never reused: every call to
//! [`LobbyClient::connect`](crate::LobbyClient::connect) asks a [`Connector`]
//! for a brand new one. The connector owns the endpoint parameters (URL,
//! timeouts, TLS), the transport only moves frames.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use spyfall_client::error::LobbyError;
//! use spyfall_client::transport::{Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), LobbyError> {
//!         // Send the JSON text frame
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, LobbyError>> {
//!         // Receive the next JSON text frame, None once closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), LobbyError> {
//!         todo!()
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     type Transport = MyTransport;
//!
//!     async fn open(&self) -> Result<MyTransport, LobbyError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::LobbyError;

/// A bidirectional text frame transport to the room server.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON frame.
/// Each call to [`recv`](Transport::recv) returns one complete JSON frame,
/// in the order the server sent them.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because the session
/// loop polls it inside `tokio::select!`. A cancelled `recv` must not lose a
/// frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::TransportSend`] if the frame could not be sent, or
    /// [`LobbyError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, message: String) -> Result<(), LobbyError>;

    /// Receive the next JSON text frame from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the server closed the connection cleanly
    async fn recv(&mut self) -> Option<Result<String, LobbyError>>;

    /// Close the connection gracefully. Closing twice is not an error.
    async fn close(&mut self) -> Result<(), LobbyError>;
}

/// Opens a fresh [`Transport`] to the room server for each connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport produced by this connector.
    type Transport: Transport;

    /// Open a new connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be reached; the attempt then
    /// ends in [`Phase::Closed`](crate::Phase::Closed).
    async fn open(&self) -> Result<Self::Transport, LobbyError>;
}
