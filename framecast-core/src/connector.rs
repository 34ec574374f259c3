//! Transport establishment.
//!
//! The supervisor only needs "give me a connected message stream"; the
//! [`Connector`] trait is that seam. [`WsConnector`] dials a WebSocket
//! endpoint with a deadline, tests plug in in-memory transports.

use std::time::Duration;

use async_trait::async_trait;
use futures::{Sink, Stream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::error::ClientError;

/// The WebSocket stream produced by [`WsConnector`].
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A bidirectional message stream a session can run on.
pub trait Transport:
    Stream<Item = Result<Message, tungstenite::Error>>
    + Sink<Message, Error = tungstenite::Error>
    + Unpin
    + Send
    + 'static
{
}

impl<T> Transport for T where
    T: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Unpin
        + Send
        + 'static
{
}

/// Opens one transport session per call.
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: Transport;

    /// Human-readable target, for logs.
    fn target(&self) -> &str;

    /// Establish a connection. Any error counts as one failed attempt.
    async fn connect(&self) -> Result<Self::Stream, ClientError>;
}

// ── WsConnector ──────────────────────────────────────────────────

/// Dials a `ws://` endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    timeout: Duration,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Stream = WsStream;

    fn target(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<WsStream, ClientError> {
        let (ws, response) = tokio::time::timeout(self.timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ClientError::ConnectTimeout(self.timeout))??;
        debug!(url = %self.url, status = %response.status(), "websocket handshake complete");
        Ok(ws)
    }
}

// ── Tests ────────────────────────────────────────────────────────
