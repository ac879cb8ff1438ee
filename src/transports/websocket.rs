//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! [`WebSocketTransport`] carries lobby frames as WebSocket text messages and
//! [`WebSocketConnector`] opens one per connection attempt. Both `ws://` and
//! `wss://` URLs are supported; TLS is handled by
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Feature gate
//!
//! Only available with the `transport-websocket` feature (enabled by default).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), spyfall_client::LobbyError> {
//! use spyfall_client::{LobbyClient, LobbyConfig, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new("ws://localhost:4212")
//!     .with_connect_timeout(std::time::Duration::from_secs(5));
//! let (mut client, mut events) = LobbyClient::new(connector, LobbyConfig::default());
//! client.connect("Alice", None)?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use crate::error::LobbyError;
use crate::transport::{Connector, Transport};

/// The underlying WebSocket stream, exposed for [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// Only text frames carry lobby messages. Pings and pongs are left to
/// tungstenite, binary frames are skipped, and a close frame ends the stream.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) only awaits `StreamExt::next`, which is
/// cancel-safe, so no frame is lost when it is raced in `tokio::select!`.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::Io`] if the URL is invalid or the server cannot be
    /// reached. The [`ErrorKind`](std::io::ErrorKind) of an underlying I/O
    /// error is preserved; anything else maps to `ErrorKind::Other`.
    pub async fn connect(url: &str) -> Result<Self, LobbyError> {
        debug!(url = %url, "opening WebSocket");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            LobbyError::Io(std::io::Error::new(kind, e))
        })?;

        info!(url = %url, "WebSocket open");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    /// Like [`connect`](Self::connect), bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::Timeout`] if the deadline elapses first.
    pub async fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, LobbyError> {
        tokio::time::timeout(timeout, Self::connect(url))
            .await
            .map_err(|_| LobbyError::Timeout)?
    }
}

/// What a single WebSocket message means for the lobby stream.
enum Frame {
    Text(String),
    End,
    Skip,
}

fn classify(msg: Message) -> Frame {
    match msg {
        Message::Text(text) => Frame::Text(text.to_string()),
        Message::Close(frame) => {
            debug!(?frame, "WebSocket close frame");
            Frame::End
        }
        // tungstenite queues the pong reply itself.
        Message::Ping(_) | Message::Pong(_) => Frame::Skip,
        Message::Binary(bytes) => {
            warn!(len = bytes.len(), "skipping binary WebSocket frame");
            Frame::Skip
        }
        // Never produced when reading.
        Message::Frame(_) => Frame::Skip,
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), LobbyError> {
        if self.closed {
            return Err(LobbyError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| LobbyError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, LobbyError>> {
        while let Some(next) = self.stream.next().await {
            let msg = match next {
                Ok(msg) => msg,
                Err(e) => return Some(Err(LobbyError::TransportReceive(e.to_string()))),
            };
            match classify(msg) {
                Frame::Text(text) => return Some(Ok(text)),
                Frame::End => return None,
                Frame::Skip => {}
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), LobbyError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| LobbyError::TransportSend(e.to_string()))
    }
}

/// Opens a [`WebSocketTransport`] to a fixed URL for every connection attempt.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    connect_timeout: Option<Duration>,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: None,
        }
    }

    /// Bound how long opening the socket may take.
    ///
    /// This covers the TCP/TLS/WebSocket upgrade only. A handshake response
    /// that never arrives still leaves the session `Connecting`.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn open(&self) -> Result<WebSocketTransport, LobbyError> {
        match self.connect_timeout {
            Some(timeout) => WebSocketTransport::connect_with_timeout(&self.url, timeout).await,
            None => WebSocketTransport::connect(&self.url).await,
        }
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
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
    use tokio::net::TcpListener;

    #[test]
    fn websocket_transport_is_send_and_debug() {
        fn assert_send_debug<T: Send + std::fmt::Debug>() {}
        assert_send_debug::<WebSocketTransport>();
        assert_send_debug::<WebSocketConnector>();
    }

    /// Run `handler` as a one-shot WebSocket server and return its URL.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn connector_fails_with_invalid_url() {
        let err = WebSocketConnector::new("not-a-valid-url")
            .open()
            .await
            .unwrap_err();
        assert!(matches!(err, LobbyError::Io(_)));
    }

    #[tokio::test]
    async fn connector_fails_with_unreachable_host() {
        let err = WebSocketConnector::new("ws://127.0.0.1:1")
            .open()
            .await
            .unwrap_err();
        assert!(matches!(err, LobbyError::Io(_)));
    }

    #[tokio::test]
    async fn connector_times_out() {
        // TEST-NET-1 is non-routable.
        let err = WebSocketConnector::new("ws://192.0.2.1:1")
            .with_connect_timeout(Duration::from_millis(50))
            .open()
            .await
            .unwrap_err();
        assert!(matches!(err, LobbyError::Timeout));
    }

    #[tokio::test]
    async fn handshake_frames_cross_the_socket() {
        let url = start_mock_server(|mut ws| async move {
            let Some(Ok(Message::Text(request))) = ws.next().await else {
                panic!("expected handshake request");
            };
            assert_eq!(request.as_str(), r#"{"name":"Alice","room":null}"#);
            ws.send(Message::Text(
                r#"{"Ok":{"room_id":"R1","players":["Alice"]}}"#.into(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketConnector::new(url).open().await.unwrap();
        transport
            .send(r#"{"name":"Alice","room":null}"#.to_string())
            .await
            .unwrap();
        let reply = transport.recv().await.unwrap().unwrap();
        assert_eq!(reply, r#"{"Ok":{"room_id":"R1","players":["Alice"]}}"#);
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"Join":"Bob"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"Join":"Bob"}"#);
    }

    #[tokio::test]
    async fn recv_returns_none_on_close_frame() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        // Closing twice is fine.
        transport.close().await.unwrap();

        let err = transport.send(r#""Start""#.to_string()).await.unwrap_err();
        assert!(matches!(err, LobbyError::TransportClosed));
    }

    #[tokio::test]
    async fn from_stream_wraps_existing_socket() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#""NotEnoughPlayers""#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let (ws_stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let mut transport = WebSocketTransport::from_stream(ws_stream);
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#""NotEnoughPlayers""#);
    }
}
