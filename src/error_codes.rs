//! Closed taxonomy of faults the lobby server can report.
//!
//! Handshake rejections arrive on the wire as [`JoinErr`]; a rejected start
//! request arrives as the bare `"NotEnoughPlayers"` notification. Both are
//! folded into [`ErrorCode`], which is what the session records as its last
//! error. None of these are fatal to the process.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::protocol::JoinErr;

/// Every fault the client can surface to the user.
///
/// Serializes with the same PascalCase names the server uses on the wire
/// (e.g. `"UsernameTaken"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The requested room does not exist.
    NoSuchRoom,
    /// Another participant in the target room already uses this name.
    UsernameTaken,
    /// The server could not allocate a new room.
    FailedToCreateRoom,
    /// A start request was rejected; the lobby stays open.
    NotEnoughPlayers,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoSuchRoom => {
                "No room with that code exists. Check the code or create a new room."
            }
            Self::UsernameTaken => {
                "Someone in that room already uses this name. Pick a different name."
            }
            Self::FailedToCreateRoom => {
                "The server could not create a room right now. Please try again later."
            }
            Self::NotEnoughPlayers => {
                "Not enough players to start the game. Invite more players and try again."
            }
        }
    }

    /// Whether this fault ends the connection attempt.
    ///
    /// Handshake faults leave the client `Idle`; `NotEnoughPlayers` keeps the
    /// lobby open.
    pub fn ends_attempt(&self) -> bool {
        !matches!(self, Self::NotEnoughPlayers)
    }
}

impl From<JoinErr> for ErrorCode {
    fn from(err: JoinErr) -> Self {
        match err {
            JoinErr::NoSuchRoom => Self::NoSuchRoom,
            JoinErr::UsernameTaken => Self::UsernameTaken,
            JoinErr::FailedToCreateRoom => Self::FailedToCreateRoom,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

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

    #[test]
    fn join_errors_map_onto_matching_codes() {
        assert_eq!(ErrorCode::from(JoinErr::NoSuchRoom), ErrorCode::NoSuchRoom);
        assert_eq!(
            ErrorCode::from(JoinErr::UsernameTaken),
            ErrorCode::UsernameTaken
        );
        assert_eq!(
            ErrorCode::from(JoinErr::FailedToCreateRoom),
            ErrorCode::FailedToCreateRoom
        );
    }

    #[test]
    fn only_not_enough_players_keeps_the_attempt_alive() {
        assert!(ErrorCode::NoSuchRoom.ends_attempt());
        assert!(ErrorCode::UsernameTaken.ends_attempt());
        assert!(ErrorCode::FailedToCreateRoom.ends_attempt());
        assert!(!ErrorCode::NotEnoughPlayers.ends_attempt());
    }

    #[test]
    fn serializes_as_pascal_case_literal() {
        let json = serde_json::to_string(&ErrorCode::NotEnoughPlayers).unwrap();
        assert_eq!(json, r#""NotEnoughPlayers""#);
        let back: ErrorCode = serde_json::from_str(r#""UsernameTaken""#).unwrap();
        assert_eq!(back, ErrorCode::UsernameTaken);
    }

    #[test]
    fn display_uses_description() {
        let code = ErrorCode::NoSuchRoom;
        assert_eq!(code.to_string(), code.description());
    }
}
