#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire format tests for the Spyfall client.
//!
//! Outbound frames are compared against the exact text the server expects.
//! Inbound fixtures are copied from real server output (field order
//! included) and must parse into the matching protocol types.

use spyfall_client::error_codes::ErrorCode;
use spyfall_client::protocol::{
    Assignment, BrokerMessage, ClientMessage, Connected, GameStart, JoinErr, JoinRequest,
    JoinResponse,
};

fn parse<T: serde::de::DeserializeOwned>(json: &str) -> T {
    serde_json::from_str(json).unwrap_or_else(|e| panic!("failed to parse {json}: {e}"))
}

// ════════════════════════════════════════════════════════════════════
// Outbound frames
// ════════════════════════════════════════════════════════════════════

#[test]
fn create_room_request_sends_null_room() {
    let json = serde_json::to_string(&JoinRequest::new("Alice", None)).unwrap();
    assert_eq!(json, r#"{"name":"Alice","room":null}"#);
}

#[test]
fn join_room_request_sends_room_code() {
    let json = serde_json::to_string(&JoinRequest::new("Bob", Some("ABCD1234"))).unwrap();
    assert_eq!(json, r#"{"name":"Bob","room":"ABCD1234"}"#);
}

#[test]
fn room_code_is_trimmed_and_uppercased() {
    let request = JoinRequest::new("Bob", Some("  abcd1234\n"));
    assert_eq!(request.room.as_deref(), Some("ABCD1234"));
    assert!(!request.creates_room());
}

#[test]
fn blank_room_code_creates_a_room() {
    for code in ["", "   ", "\t"] {
        let request = JoinRequest::new("Bob", Some(code));
        assert!(request.creates_room(), "{code:?} should create a room");
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"name":"Bob","room":null}"#
        );
    }
}

#[test]
fn lobby_notifications_are_bare_string_literals() {
    assert_eq!(
        serde_json::to_string(&ClientMessage::Start).unwrap(),
        r#""Start""#
    );
    assert_eq!(
        serde_json::to_string(&ClientMessage::Leave).unwrap(),
        r#""Leave""#
    );
}

// ════════════════════════════════════════════════════════════════════
// Handshake responses
// ════════════════════════════════════════════════════════════════════

#[test]
fn handshake_ok_fixture() {
    let response: JoinResponse =
        parse(r#"{"Ok":{"room_id":"7K2QD","players":["Alice","Bob"]}}"#);
    assert_eq!(
        response,
        JoinResponse::Ok(Connected {
            room_id: "7K2QD".into(),
            players: vec!["Alice".into(), "Bob".into()],
        })
    );
}

#[test]
fn handshake_err_fixtures() {
    let cases = [
        (r#"{"Err":"NoSuchRoom"}"#, JoinErr::NoSuchRoom),
        (r#"{"Err":"UsernameTaken"}"#, JoinErr::UsernameTaken),
        (r#"{"Err":"FailedToCreateRoom"}"#, JoinErr::FailedToCreateRoom),
    ];
    for (json, expected) in cases {
        let response: JoinResponse = parse(json);
        assert_eq!(response, JoinResponse::Err(expected), "{json}");
    }
}

#[test]
fn handshake_response_converts_into_result() {
    let ok: Result<Connected, JoinErr> =
        parse::<JoinResponse>(r#"{"Ok":{"room_id":"R1","players":[]}}"#).into();
    assert_eq!(ok.unwrap().room_id, "R1");

    let err: Result<Connected, JoinErr> = parse::<JoinResponse>(r#"{"Err":"NoSuchRoom"}"#).into();
    assert_eq!(ErrorCode::from(err.unwrap_err()), ErrorCode::NoSuchRoom);
}

#[test]
fn handshake_rejects_unknown_shapes() {
    for json in [
        r#"{"Err":"RoomFull"}"#,
        r#"{"Ok":{"room_id":"R1"}}"#,
        r#"{"Join":"Bob"}"#,
        r#""Ok""#,
        "not json",
    ] {
        assert!(
            serde_json::from_str::<JoinResponse>(json).is_err(),
            "{json} should not parse as a handshake response"
        );
    }
}

// ════════════════════════════════════════════════════════════════════
// Broker events
// ════════════════════════════════════════════════════════════════════

#[test]
fn membership_fixtures() {
    assert_eq!(
        parse::<BrokerMessage>(r#"{"Join":"Carol"}"#),
        BrokerMessage::Join("Carol".into())
    );
    assert_eq!(
        parse::<BrokerMessage>(r#"{"Left":"Carol"}"#),
        BrokerMessage::Left("Carol".into())
    );
}

#[test]
fn not_enough_players_is_a_bare_literal() {
    assert_eq!(
        parse::<BrokerMessage>(r#""NotEnoughPlayers""#),
        BrokerMessage::NotEnoughPlayers
    );
    assert!(serde_json::from_str::<BrokerMessage>(r#""NotEnoughplayers""#).is_err());
}

#[test]
fn started_fixture_for_regular_player() {
    let message: BrokerMessage = parse(
        r#"{"Started":{"assignment":{"location":"Pirate Ship","role":"Cook"},"first":"Bob"}}"#,
    );
    let BrokerMessage::Started(start) = message else {
        panic!("expected Started, got {message:?}");
    };
    assert_eq!(
        start,
        GameStart {
            first: "Bob".into(),
            assignment: Some(Assignment {
                location: "Pirate Ship".into(),
                role: "Cook".into(),
            }),
        }
    );
    assert!(!start.is_spy());
    assert_eq!(start.location(), Some("Pirate Ship"));
    assert_eq!(start.role(), Some("Cook"));
}

#[test]
fn started_fixture_for_spy() {
    let message: BrokerMessage = parse(r#"{"Started":{"assignment":null,"first":"Alice"}}"#);
    let BrokerMessage::Started(start) = message else {
        panic!("expected Started, got {message:?}");
    };
    assert!(start.is_spy());
    assert_eq!(start.first, "Alice");
    assert_eq!(start.location(), None);
    assert_eq!(start.role(), None);
}

#[test]
fn broker_rejects_unknown_shapes() {
    for json in [
        r#"{"Kick":"Bob"}"#,
        r#"{"Join":42}"#,
        r#"{"Started":{"assignment":null}}"#,
        r#""Start""#,
        r#"{"Ok":{"room_id":"R1","players":[]}}"#,
        "",
    ] {
        assert!(
            serde_json::from_str::<BrokerMessage>(json).is_err(),
            "{json:?} should not parse as a broker event"
        );
    }
}

// ════════════════════════════════════════════════════════════════════
// Error codes
// ════════════════════════════════════════════════════════════════════

#[test]
fn error_codes_use_server_spelling() {
    for (code, literal) in [
        (ErrorCode::NoSuchRoom, r#""NoSuchRoom""#),
        (ErrorCode::UsernameTaken, r#""UsernameTaken""#),
        (ErrorCode::FailedToCreateRoom, r#""FailedToCreateRoom""#),
        (ErrorCode::NotEnoughPlayers, r#""NotEnoughPlayers""#),
    ] {
        assert_eq!(serde_json::to_string(&code).unwrap(), literal);
    }
}
