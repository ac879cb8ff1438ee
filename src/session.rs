//! Session state machine.
//!
//! A [`Session`] is the single mutable record describing one connection
//! attempt: its [`Phase`], the display name, the room, the roster, the last
//! reported fault and the game start payload.
//!
//! Every inbound frame goes through [`Session::receive`]. The current phase
//! decides how the frame is read:
//!
//! | Phase                  | Frame is parsed as          |
//! |------------------------|-----------------------------|
//! | `Connecting`           | [`JoinResponse`] (handshake) |
//! | `InLobby` / `InGame`   | [`BrokerMessage`]           |
//! | `Idle` / `Closed`      | ignored                     |
//!
//! Because the phase is the handler, switching from the handshake to the
//! roster synchronizer is a single assignment to `phase` inside the same
//! `&mut self` call that consumed the handshake response. Every roster edit
//! works on `self.roster` directly, so it always sees the result of the
//! previous edit.
//!
//! ```text
//! Idle ──connect──▶ Connecting ──Ok──▶ InLobby ──Started──▶ InGame
//!   ▲                 │    │              │                    │
//!   └────── Err ──────┘    │              └──── close ─────────┴──▶ Idle
//!                          └── close ──▶ Closed
//! ```

use std::fmt;

use tracing::{debug, info, warn};

use crate::error_codes::ErrorCode;
use crate::event::LobbyEvent;
use crate::protocol::{BrokerMessage, Connected, GameStart, JoinErr, JoinResponse};
use crate::roster::Roster;

/// Lifecycle phase of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// No connection attempt in progress.
    #[default]
    Idle,
    /// Transport opening or handshake response pending.
    Connecting,
    /// Handshake succeeded; roster is live.
    InLobby,
    /// The game has started.
    InGame,
    /// The transport ended before the handshake completed.
    Closed,
}

impl Phase {
    /// `true` while the server has assigned a room to this session.
    pub fn has_room(self) -> bool {
        matches!(self, Self::InLobby | Self::InGame)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::InLobby => "in lobby",
            Self::InGame => "in game",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Result of feeding one inbound frame to the session.
#[derive(Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct Transition {
    /// Event to report to the consumer, if the frame changed anything visible.
    pub event: Option<LobbyEvent>,
    /// The transport must be closed and discarded.
    pub hang_up: bool,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    fn emit(event: LobbyEvent) -> Self {
        Self {
            event: Some(event),
            hang_up: false,
        }
    }

    fn hang_up(event: LobbyEvent) -> Self {
        Self {
            event: Some(event),
            hang_up: true,
        }
    }
}

/// Read-only copy of a [`Session`] for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub display_name: String,
    pub room_id: Option<String>,
    pub roster: Vec<String>,
    pub last_error: Option<ErrorCode>,
    pub game_start: Option<GameStart>,
}

/// State of one connection attempt.
///
/// Invariants kept after every method call:
/// - `roster` has no duplicate names,
/// - `game_start` is set exactly when `phase` is `InGame`,
/// - `room_id` is set exactly when `phase` is `InLobby` or `InGame`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    phase: Phase,
    display_name: String,
    room_id: Option<String>,
    roster: Roster,
    last_error: Option<ErrorCode>,
    game_start: Option<GameStart>,
}

impl Session {
    /// A fresh `Idle` session.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session for an attempt that has just been started by the user.
    pub fn connecting(display_name: impl Into<String>) -> Self {
        Self {
            phase: Phase::Connecting,
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn last_error(&self) -> Option<ErrorCode> {
        self.last_error
    }

    pub fn game_start(&self) -> Option<&GameStart> {
        self.game_start.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            display_name: self.display_name.clone(),
            room_id: self.room_id.clone(),
            roster: self.roster.to_vec(),
            last_error: self.last_error,
            game_start: self.game_start.clone(),
        }
    }

    /// Apply one inbound text frame.
    pub fn receive(&mut self, frame: &str) -> Transition {
        match self.phase {
            Phase::Connecting => self.complete_handshake(frame),
            Phase::InLobby | Phase::InGame => self.apply_broker_frame(frame),
            Phase::Idle | Phase::Closed => {
                debug!(phase = %self.phase, "dropping frame received without an active handshake");
                Transition::none()
            }
        }
    }

    /// The transport ended, cleanly or not.
    ///
    /// After a successful handshake this returns the session to a fresh
    /// `Idle` state. Before it, the attempt is marked `Closed`.
    pub fn transport_closed(&mut self) {
        match self.phase {
            Phase::InLobby | Phase::InGame => {
                debug!(room = ?self.room_id, "connection closed, resetting session");
                *self = Self::new();
            }
            Phase::Connecting => {
                debug!("connection closed before handshake completed");
                self.phase = Phase::Closed;
            }
            Phase::Idle | Phase::Closed => {}
        }
    }

    fn complete_handshake(&mut self, frame: &str) -> Transition {
        let response = match serde_json::from_str::<JoinResponse>(frame) {
            Ok(response) => response,
            Err(e) => {
                warn!("expected handshake response, ignoring frame: {e}; raw: {frame}");
                return Transition::none();
            }
        };

        let result: Result<Connected, JoinErr> = response.into();
        match result {
            Ok(Connected { room_id, .. }) if room_id.is_empty() => {
                warn!("handshake response carried an empty room id, ignoring");
                Transition::none()
            }
            Ok(Connected { room_id, players }) => {
                self.last_error = None;
                self.roster = Roster::from_names(players);
                self.room_id = Some(room_id.clone());
                self.phase = Phase::InLobby;
                info!(
                    room = %room_id,
                    players = self.roster.len(),
                    "joined room as {}",
                    self.display_name
                );
                Transition::emit(LobbyEvent::Joined {
                    room_id,
                    players: self.roster.to_vec(),
                })
            }
            Err(err) => {
                let error = ErrorCode::from(err);
                self.last_error = Some(error);
                self.phase = Phase::Idle;
                info!(?error, "handshake rejected");
                Transition::hang_up(LobbyEvent::JoinFailed { error })
            }
        }
    }

    fn apply_broker_frame(&mut self, frame: &str) -> Transition {
        let message = match serde_json::from_str::<BrokerMessage>(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("unrecognized frame (protocol mismatch?): {e}; raw: {frame}");
                return Transition::none();
            }
        };

        if self.phase == Phase::InGame {
            debug!(?message, "game already started, ignoring broker event");
            return Transition::none();
        }

        match message {
            BrokerMessage::Join(name) => match self.roster.admit(name.clone()) {
                Ok(()) => {
                    debug!(player = %name, "player joined");
                    Transition::emit(LobbyEvent::PlayerJoined { name })
                }
                Err(dup) => {
                    debug!("duplicate join notification: {dup}");
                    Transition::none()
                }
            },
            BrokerMessage::Left(name) => {
                if self.roster.remove(&name) == 0 {
                    debug!(player = %name, "left notification for absent player");
                    return Transition::none();
                }
                debug!(player = %name, "player left");
                Transition::emit(LobbyEvent::PlayerLeft { name })
            }
            BrokerMessage::Started(start) => {
                info!(first = %start.first, spy = start.is_spy(), "game started");
                self.last_error = None;
                self.game_start = Some(start.clone());
                self.phase = Phase::InGame;
                Transition::emit(LobbyEvent::GameStarted(start))
            }
            BrokerMessage::NotEnoughPlayers => {
                let error = ErrorCode::NotEnoughPlayers;
                debug!("start request rejected");
                self.last_error = Some(error);
                Transition::emit(LobbyEvent::StartRejected { error })
            }
        }
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
    use crate::protocol::Assignment;
    use std::collections::BTreeSet;

    fn assert_invariants(session: &Session) {
        let names: BTreeSet<&str> = session.roster().iter().collect();
        assert_eq!(names.len(), session.roster().len(), "duplicate in roster");
        assert_eq!(
            session.game_start().is_some(),
            session.phase() == Phase::InGame,
            "game_start must be set exactly in game: {session:?}"
        );
        assert_eq!(
            session.room_id().is_some_and(|id| !id.is_empty()),
            session.phase().has_room(),
            "room_id must be set exactly while in a room: {session:?}"
        );
    }

    /// Scenario A: Alice creates room R1.
    fn alice_in_r1() -> Session {
        let mut session = Session::connecting("Alice");
        let step = session.receive(r#"{"Ok":{"room_id":"R1","players":["Alice"]}}"#);
        assert!(!step.hang_up);
        session
    }

    #[test]
    fn handshake_success_enters_lobby() {
        let session = alice_in_r1();
        assert_eq!(session.phase(), Phase::InLobby);
        assert_eq!(session.room_id(), Some("R1"));
        assert_eq!(session.roster().to_vec(), vec!["Alice"]);
        assert_eq!(session.last_error(), None);
        assert_invariants(&session);
    }

    #[test]
    fn handshake_success_emits_joined() {
        let mut session = Session::connecting("Alice");
        let step = session.receive(r#"{"Ok":{"room_id":"R1","players":["Alice"]}}"#);
        assert_eq!(
            step.event,
            Some(LobbyEvent::Joined {
                room_id: "R1".into(),
                players: vec!["Alice".into()],
            })
        );
    }

    #[test]
    fn lobby_scenario_walkthrough() {
        let mut session = alice_in_r1();

        // B
        let step = session.receive(r#"{"Join":"Bob"}"#);
        assert_eq!(
            step.event,
            Some(LobbyEvent::PlayerJoined { name: "Bob".into() })
        );
        assert_eq!(session.roster().to_vec(), vec!["Bob", "Alice"]);
        assert_invariants(&session);

        // C
        let step = session.receive(r#"{"Left":"Alice"}"#);
        assert_eq!(
            step.event,
            Some(LobbyEvent::PlayerLeft {
                name: "Alice".into()
            })
        );
        assert_eq!(session.roster().to_vec(), vec!["Bob"]);
        assert_invariants(&session);

        // D
        let step = session.receive(r#""NotEnoughPlayers""#);
        assert_eq!(
            step.event,
            Some(LobbyEvent::StartRejected {
                error: ErrorCode::NotEnoughPlayers
            })
        );
        assert!(!step.hang_up);
        assert_eq!(session.last_error(), Some(ErrorCode::NotEnoughPlayers));
        assert_eq!(session.phase(), Phase::InLobby);
        assert_eq!(session.roster().to_vec(), vec!["Bob"]);
        assert_invariants(&session);

        // E
        let step = session.receive(r#"{"Started":{"first":"Bob","assignment":null}}"#);
        let expected = GameStart {
            first: "Bob".into(),
            assignment: None,
        };
        assert_eq!(step.event, Some(LobbyEvent::GameStarted(expected.clone())));
        assert_eq!(session.phase(), Phase::InGame);
        assert_eq!(session.game_start(), Some(&expected));
        assert_eq!(session.last_error(), None);
        assert_invariants(&session);
    }

    #[test]
    fn handshake_failure_returns_to_idle_and_hangs_up() {
        let mut session = Session::connecting("Alice");
        let step = session.receive(r#"{"Err":"UsernameTaken"}"#);
        assert!(step.hang_up);
        assert_eq!(
            step.event,
            Some(LobbyEvent::JoinFailed {
                error: ErrorCode::UsernameTaken
            })
        );
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.last_error(), Some(ErrorCode::UsernameTaken));
        assert!(session.roster().is_empty());
        assert_invariants(&session);
    }

    #[test]
    fn every_join_err_maps_to_last_error() {
        for (wire, code) in [
            ("NoSuchRoom", ErrorCode::NoSuchRoom),
            ("UsernameTaken", ErrorCode::UsernameTaken),
            ("FailedToCreateRoom", ErrorCode::FailedToCreateRoom),
        ] {
            let mut session = Session::connecting("Alice");
            let step = session.receive(&format!(r#"{{"Err":"{wire}"}}"#));
            assert!(step.hang_up);
            assert_eq!(session.last_error(), Some(code));
        }
    }

    #[test]
    fn first_frame_is_never_read_as_broker_event() {
        let mut session = Session::connecting("Alice");
        let step = session.receive(r#"{"Join":"Bob"}"#);
        assert_eq!(step, Transition::default());
        assert_eq!(session.phase(), Phase::Connecting);
        assert!(session.roster().is_empty());

        let step = session.receive(r#""NotEnoughPlayers""#);
        assert_eq!(step, Transition::default());
        assert_eq!(session.last_error(), None);
        assert_invariants(&session);
    }

    #[test]
    fn handshake_with_empty_room_id_is_ignored() {
        let mut session = Session::connecting("Alice");
        let step = session.receive(r#"{"Ok":{"room_id":"","players":["Alice"]}}"#);
        assert_eq!(step, Transition::default());
        assert_eq!(session.phase(), Phase::Connecting);
        assert_invariants(&session);
    }

    #[test]
    fn handshake_frame_after_lobby_is_a_protocol_mismatch() {
        let mut session = alice_in_r1();
        let step = session.receive(r#"{"Ok":{"room_id":"R2","players":["Mallory"]}}"#);
        assert_eq!(step, Transition::default());
        assert_eq!(session.room_id(), Some("R1"));
        assert_eq!(session.roster().to_vec(), vec!["Alice"]);
    }

    #[test]
    fn duplicate_join_is_ignored() {
        let mut session = alice_in_r1();
        let _ = session.receive(r#"{"Join":"Bob"}"#);
        let step = session.receive(r#"{"Join":"Bob"}"#);
        assert_eq!(step.event, None);
        assert_eq!(session.roster().to_vec(), vec!["Bob", "Alice"]);
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn repeated_left_is_idempotent() {
        let mut session = alice_in_r1();
        let _ = session.receive(r#"{"Join":"Bob"}"#);
        let _ = session.receive(r#"{"Left":"Bob"}"#);
        let after_first = session.clone();
        let step = session.receive(r#"{"Left":"Bob"}"#);
        assert_eq!(step.event, None);
        assert_eq!(session, after_first);
    }

    #[test]
    fn unknown_frames_leave_state_unchanged() {
        let mut session = alice_in_r1();
        let before = session.clone();
        for frame in [
            r#""Start""#,
            r#"{"Kick":"Alice"}"#,
            r#"{"Join":42}"#,
            "not json",
            "",
            r#"{"Started":{"assignment":null}}"#,
        ] {
            let step = session.receive(frame);
            assert_eq!(step, Transition::default(), "frame {frame:?}");
        }
        assert_eq!(session, before);
    }

    #[test]
    fn started_is_terminal_for_roster_and_payload() {
        let mut session = alice_in_r1();
        let _ = session.receive(
            r#"{"Started":{"first":"Alice","assignment":{"location":"Bank","role":"Teller"}}}"#,
        );
        let payload = session.game_start().cloned().unwrap();
        assert_eq!(payload.location(), Some("Bank"));
        assert_eq!(payload.role(), Some("Teller"));
        assert!(!payload.is_spy());

        for frame in [
            r#"{"Join":"Carol"}"#,
            r#"{"Left":"Alice"}"#,
            r#""NotEnoughPlayers""#,
            r#"{"Started":{"first":"Carol","assignment":null}}"#,
        ] {
            let step = session.receive(frame);
            assert_eq!(step.event, None, "frame {frame:?}");
        }
        assert_eq!(session.phase(), Phase::InGame);
        assert_eq!(session.game_start(), Some(&payload));
        assert_eq!(session.roster().to_vec(), vec!["Alice"]);
        assert_eq!(session.last_error(), None);
        assert_invariants(&session);
    }

    #[test]
    fn close_after_handshake_resets_to_fresh_idle() {
        let mut session = alice_in_r1();
        let _ = session.receive(r#""NotEnoughPlayers""#);
        session.transport_closed();
        assert_eq!(session, Session::new());
        assert_invariants(&session);
    }

    #[test]
    fn close_in_game_resets_to_fresh_idle() {
        let mut session = alice_in_r1();
        let _ = session.receive(r#"{"Started":{"first":"Alice","assignment":null}}"#);
        session.transport_closed();
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.game_start(), None);
        assert_eq!(session.room_id(), None);
        assert_invariants(&session);
    }

    #[test]
    fn close_before_handshake_is_terminal() {
        let mut session = Session::connecting("Alice");
        session.transport_closed();
        assert_eq!(session.phase(), Phase::Closed);
        assert_eq!(session.display_name(), "Alice");

        let step = session.receive(r#"{"Ok":{"room_id":"R1","players":["Alice"]}}"#);
        assert_eq!(step, Transition::default());
        assert_eq!(session.phase(), Phase::Closed);
        assert_invariants(&session);
    }

    #[test]
    fn close_after_rejected_handshake_keeps_error() {
        let mut session = Session::connecting("Alice");
        let _ = session.receive(r#"{"Err":"NoSuchRoom"}"#);
        session.transport_closed();
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.last_error(), Some(ErrorCode::NoSuchRoom));
    }

    #[test]
    fn initial_roster_duplicates_are_collapsed() {
        let mut session = Session::connecting("Alice");
        let _ = session.receive(r#"{"Ok":{"room_id":"R1","players":["Alice","Bob","Alice"]}}"#);
        assert_eq!(session.roster().to_vec(), vec!["Alice", "Bob"]);
        assert_invariants(&session);
    }

    #[test]
    fn roster_tracks_net_membership_over_long_sequences() {
        const NAMES: [&str; 5] = ["Alice", "Bob", "Carol", "Dave", "Eve"];
        // Small LCG so the sequence is deterministic without extra crates.
        let mut seed: u64 = 0x5eed;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };

        for _ in 0..50 {
            let mut session = alice_in_r1();
            let mut expected: BTreeSet<&str> = BTreeSet::from(["Alice"]);
            for _ in 0..40 {
                let name = NAMES[next() % NAMES.len()];
                if next() % 2 == 0 {
                    let _ = session.receive(&format!(r#"{{"Join":"{name}"}}"#));
                    expected.insert(name);
                } else {
                    let _ = session.receive(&format!(r#"{{"Left":"{name}"}}"#));
                    expected.remove(name);
                }
                assert_invariants(&session);
                let actual: BTreeSet<&str> = session.roster().iter().collect();
                assert_eq!(actual, expected);
            }
        }
    }

    #[test]
    fn snapshot_mirrors_session() {
        let mut session = alice_in_r1();
        let _ = session.receive(r#"{"Join":"Bob"}"#);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, Phase::InLobby);
        assert_eq!(snapshot.display_name, "Alice");
        assert_eq!(snapshot.room_id.as_deref(), Some("R1"));
        assert_eq!(snapshot.roster, vec!["Bob", "Alice"]);
        assert_eq!(snapshot.last_error, None);
        assert_eq!(snapshot.game_start, None);
    }

    #[test]
    fn idle_session_ignores_frames() {
        let mut session = Session::new();
        let step = session.receive(r#"{"Ok":{"room_id":"R1","players":["Alice"]}}"#);
        assert_eq!(step, Transition::default());
        assert_eq!(session, Session::new());
    }

    #[test]
    fn assignment_helpers_for_spy() {
        let start = GameStart {
            first: "Bob".into(),
            assignment: None,
        };
        assert!(start.is_spy());
        assert_eq!(start.location(), None);
        let start = GameStart {
            first: "Bob".into(),
            assignment: Some(Assignment {
                location: "Beach".into(),
                role: "Lifeguard".into(),
            }),
        };
        assert_eq!(start.role(), Some("Lifeguard"));
    }
}
