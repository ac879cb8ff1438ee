//! Wire-compatible protocol types for the Spyfall room server.
//!
//! Frames are UTF-8 JSON text. Enums use serde's default externally tagged
//! representation, which is exactly what the server emits:
//!
//! - newtype variants become single-key objects (`{"Join":"Bob"}`),
//! - unit variants become bare string literals (`"Start"`).

use serde::{Deserialize, Serialize};

// ── Outbound ────────────────────────────────────────────────────────

/// Handshake request: the first frame sent on a fresh transport.
///
/// `room` is `null` when creating a new room and holds the requested room
/// code when joining an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub name: String,
    pub room: Option<String>,
}

impl JoinRequest {
    /// Build a handshake request from user input.
    ///
    /// Room codes are trimmed and upper-cased (the server issues uppercase
    /// Crockford base32 codes). A blank room code means "create a room".
    pub fn new(name: impl Into<String>, room: Option<&str>) -> Self {
        let room = room
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_uppercase);
        Self {
            name: name.into(),
            room,
        }
    }

    /// `true` when this request asks the server to allocate a new room.
    pub fn creates_room(&self) -> bool {
        self.room.is_none()
    }
}

/// Notifications the client sends on an established lobby connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Ask the server to start the game.
    Start,
    /// Leave the room. The server answers by closing the connection.
    Leave,
}

// ── Inbound: handshake ──────────────────────────────────────────────

/// Handshake response: the first frame received after a [`JoinRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinResponse {
    Ok(Connected),
    Err(JoinErr),
}

impl From<JoinResponse> for Result<Connected, JoinErr> {
    fn from(response: JoinResponse) -> Self {
        match response {
            JoinResponse::Ok(connected) => Ok(connected),
            JoinResponse::Err(err) => Err(err),
        }
    }
}

/// Payload of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connected {
    /// Authoritative room identifier assigned by the server.
    pub room_id: String,
    /// Everyone currently in the room, including the connecting player.
    pub players: Vec<String>,
}

/// Why the server refused a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinErr {
    NoSuchRoom,
    UsernameTaken,
    FailedToCreateRoom,
}

// ── Inbound: steady state ───────────────────────────────────────────

/// Events the server broadcasts to a room after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerMessage {
    /// A player entered the room.
    Join(String),
    /// A player left the room.
    Left(String),
    /// The game has begun.
    Started(GameStart),
    /// A start request was refused.
    NotEnoughPlayers,
}

/// Per-player game start payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStart {
    /// Player who asks the first question.
    pub first: String,
    /// Location and role for this player; `None` means this player is the spy.
    pub assignment: Option<Assignment>,
}

impl GameStart {
    /// The spy is the only player sent no assignment.
    pub fn is_spy(&self) -> bool {
        self.assignment.is_none()
    }

    pub fn location(&self) -> Option<&str> {
        self.assignment.as_ref().map(|a| a.location.as_str())
    }

    pub fn role(&self) -> Option<&str> {
        self.assignment.as_ref().map(|a| a.role.as_str())
    }
}

/// Secret location and role handed to every non-spy player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub location: String,
    pub role: String,
}
