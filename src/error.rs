//! Error types for the lobby client.
//!
//! These cover local failures (transport, serialization, misuse of the
//! client API). Faults reported by the server are not errors in this sense;
//! they are recorded on the session as an [`ErrorCode`](crate::ErrorCode).

use thiserror::Error;

/// Errors that can occur when using the lobby client.
#[derive(Debug, Error)]
pub enum LobbyError {
    /// Failed to send a frame through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection is already closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted a lobby action without an established lobby connection.
    #[error("not in a lobby")]
    NotInLobby,

    /// `connect` was called with an empty display name.
    #[error("display name must not be empty")]
    EmptyDisplayName,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for lobby client operations.
pub type Result<T> = std::result::Result<T, LobbyError>;
