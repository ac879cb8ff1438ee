#![no_main]

use libfuzzer_sys::fuzz_target;
use spyfall_client::protocol::{BrokerMessage, JoinResponse};
use spyfall_client::{Phase, Session};

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<JoinResponse>(data);
    let _ = serde_json::from_slice::<BrokerMessage>(data);

    let Ok(frame) = std::str::from_utf8(data) else {
        return;
    };

    // Feed the frame to a session in the handshake phase and to one already
    // in a lobby, twice each. No frame may break the invariants.
    let mut in_lobby = Session::connecting("fuzz");
    let _ = in_lobby.receive(r#"{"Ok":{"room_id":"FUZZ","players":["fuzz","Bob"]}}"#);
    for mut session in [Session::connecting("fuzz"), in_lobby] {
        for _ in 0..2 {
            let _ = session.receive(frame);
            check_invariants(&session);
        }
        session.transport_closed();
        assert!(matches!(session.phase(), Phase::Idle | Phase::Closed));
    }
});

fn check_invariants(session: &Session) {
    let snapshot = session.snapshot();
    let mut names = snapshot.roster.clone();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), snapshot.roster.len());
    assert_eq!(snapshot.game_start.is_some(), snapshot.phase == Phase::InGame);
    assert_eq!(
        snapshot.room_id.is_some(),
        matches!(snapshot.phase, Phase::InLobby | Phase::InGame)
    );
}
