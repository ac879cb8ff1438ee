//! # Spyfall Client
//!
//! Lobby client for the Spyfall room server. It joins or creates a room over
//! one persistent connection, keeps the roster in sync, and hands over the
//! game start payload once the server starts the game.
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any
//!   backend; WebSocket is built in (`transport-websocket`, default).
//! - **Single state machine**: every inbound frame goes through
//!   [`Session::receive`], which reads it as a handshake response or a room
//!   event depending on the current [`Phase`].
//! - **Event-driven**: typed [`LobbyEvent`]s on a channel, plus
//!   [`LobbyClient::snapshot`] for the current state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), spyfall_client::LobbyError> {
//! use spyfall_client::{LobbyClient, LobbyConfig, LobbyEvent, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new("ws://localhost:4212");
//! let (mut client, mut events) = LobbyClient::new(connector, LobbyConfig::default());
//! client.connect("Alice", None)?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         LobbyEvent::Joined { room_id, .. } => println!("room code: {room_id}"),
//!         LobbyEvent::PlayerJoined { .. } => client.start()?,
//!         LobbyEvent::GameStarted(start) => println!("first up: {}", start.first),
//!         LobbyEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod error_codes;
pub mod event;
pub mod protocol;
pub mod roster;
pub mod session;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{LobbyClient, LobbyConfig};
pub use error::LobbyError;
pub use error_codes::ErrorCode;
pub use event::LobbyEvent;
pub use protocol::{Assignment, BrokerMessage, ClientMessage, GameStart, JoinRequest, JoinResponse};
pub use roster::Roster;
pub use session::{Phase, Session, SessionSnapshot};
pub use transport::{Connector, Transport};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
