//! # Basic Lobby Example
//!
//! Joins (or creates) a Spyfall room and prints the lobby as it changes.
//!
//! 1. Connect to the room server via WebSocket
//! 2. Send the handshake with a display name and optional room code
//! 3. Follow players joining and leaving
//! 4. Type `start` to start the game, `leave` to leave, `quit` to exit
//! 5. Shut down gracefully on Ctrl+C or disconnect
//!
//! ## Running
//!
//! ```sh
//! # Start a Spyfall server on localhost:4212, then create a room:
//! cargo run --example basic_lobby -- Alice
//!
//! # Join an existing room, against another server:
//! SPYFALL_URL=ws://my-server:4212 cargo run --example basic_lobby -- Bob 7K2QD
//! ```

use std::time::Duration;

use spyfall_client::{LobbyClient, LobbyConfig, LobbyEvent, WebSocketConnector};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Default server URL when `SPYFALL_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:4212";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("SPYFALL_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "RustPlayer".to_string());
    let room = args.next();
    tracing::info!("Connecting to {url} as {name}");

    let connector = WebSocketConnector::new(url).with_connect_timeout(Duration::from_secs(5));
    let (mut client, mut event_rx) = LobbyClient::new(connector, LobbyConfig::default());
    client.connect(name, room.as_deref())?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    LobbyEvent::Connected => {
                        tracing::info!("Transport connected, awaiting handshake response");
                    }
                    LobbyEvent::Joined { room_id, players } => {
                        tracing::info!("Joined room {room_id}; share this code with friends");
                        tracing::info!("Players: {}", players.join(", "));
                    }
                    LobbyEvent::JoinFailed { error } => {
                        tracing::error!("Could not join: {error}");
                    }
                    LobbyEvent::PlayerJoined { name } => {
                        tracing::info!("{name} joined; roster: {:?}", client.snapshot().roster);
                    }
                    LobbyEvent::PlayerLeft { name } => {
                        tracing::info!("{name} left; roster: {:?}", client.snapshot().roster);
                    }
                    LobbyEvent::StartRejected { error } => {
                        tracing::warn!("Start refused: {error}");
                    }
                    LobbyEvent::GameStarted(start) => {
                        match (start.location(), start.role()) {
                            (Some(location), Some(role)) => {
                                tracing::info!("Location: {location}, role: {role}");
                            }
                            _ => tracing::info!("You are the spy!"),
                        }
                        tracing::info!("{} asks the first question", start.first);
                    }
                    LobbyEvent::Disconnected { reason } => {
                        tracing::info!("Disconnected: {}", reason.as_deref().unwrap_or("closed by server"));
                        break;
                    }
                }
            }

            line = stdin.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let result = match line.trim() {
                    "start" => client.start(),
                    "leave" => client.leave(),
                    "quit" => break,
                    "" => Ok(()),
                    other => {
                        tracing::warn!("Unknown command {other:?} (start, leave, quit)");
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    tracing::warn!("{e}");
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    // ── Shutdown ────────────────────────────────────────────────────
    client.shutdown().await;
    tracing::info!("Client shut down cleanly");

    Ok(())
}
