//! Events emitted by the lobby client to its consumer.

use crate::error_codes::ErrorCode;
use crate::protocol::GameStart;

/// Notifications delivered on the channel returned by
/// [`LobbyClient::new`](crate::LobbyClient::new).
///
/// Each event is sent after the matching session update has been committed,
/// so [`LobbyClient::snapshot`](crate::LobbyClient::snapshot) already reflects
/// it when the event is received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    /// The transport is open and the handshake request has been sent.
    Connected,
    /// The handshake succeeded.
    Joined {
        room_id: String,
        players: Vec<String>,
    },
    /// The handshake was refused. The transport is closed afterwards.
    JoinFailed { error: ErrorCode },
    /// Another player entered the lobby.
    PlayerJoined { name: String },
    /// A player left the lobby.
    PlayerLeft { name: String },
    /// The game started; this payload is final for the session.
    GameStarted(GameStart),
    /// A start request was refused; the lobby stays open.
    StartRejected { error: ErrorCode },
    /// The connection attempt ended. Always the last event of an attempt.
    Disconnected { reason: Option<String> },
}
