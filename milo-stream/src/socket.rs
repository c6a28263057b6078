//! Socket abstraction over tokio-tungstenite.
//!
//! The session loop talks to [`Socket`]/[`Connector`] rather than to
//! tokio-tungstenite directly so tests can script socket behavior.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{Result, SessionError};

/// Inbound message, reduced to what the session loop cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A text frame (JSON from the device)
    Text(String),
    /// A pong answering one of our pings
    Pong,
    /// Any other traffic; still counts as liveness
    Other,
}

/// An established WebSocket connection.
#[async_trait]
pub trait Socket: Send {
    /// Receive the next message. `None` means the stream ended.
    async fn next_message(&mut self) -> Option<Result<Message>>;

    /// Send a ping frame.
    async fn send_ping(&mut self) -> Result<()>;

    /// Close the socket. Errors during close are ignored.
    async fn close(&mut self);
}

/// Opens WebSocket connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and complete the handshake against `url`.
    async fn connect(&self, url: &Url) -> Result<Box<dyn Socket>>;
}

/// Production connector over `tokio_tungstenite::connect_async`.
pub struct TungsteniteConnector {
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    /// Create a connector with the given connect/handshake timeout.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Socket>> {
        let (stream, _response) =
            tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
                .await
                .map_err(|_| SessionError::Connect("handshake timed out".to_string()))?
                .map_err(|e| SessionError::Handshake(e.to_string()))?;

        Ok(Box::new(TungsteniteSocket { inner: stream }))
    }
}

struct TungsteniteSocket {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Socket for TungsteniteSocket {
    async fn next_message(&mut self) -> Option<Result<Message>> {
        loop {
            return match self.inner.next().await? {
                Ok(WsMessage::Text(text)) => Some(Ok(Message::Text(text))),
                Ok(WsMessage::Pong(_)) => Some(Ok(Message::Pong)),
                Ok(WsMessage::Close(_)) => None,
                // Pings are answered by tungstenite internally; binary and
                // raw frames still count as liveness.
                Ok(_) => {
                    continue;
                }
                Err(e) => Some(Err(SessionError::Socket(e.to_string()))),
            };
        }
    }

    async fn send_ping(&mut self) -> Result<()> {
        self.inner
            .send(WsMessage::Ping(Vec::new()))
            .await
            .map_err(|e| SessionError::Socket(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.inner.close(None).await;
    }
}
