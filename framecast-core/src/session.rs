//! One live connection: read loop, message dispatch, keepalive scoping.
//!
//! ```text
//!             ┌──────────── Transport ────────────┐
//!             │ read half              write half │
//!             └────┬───────────────────────▲──────┘
//!                  │                       │ ping every 30s
//!   ServerMessage::parse            KeepaliveAgent (task, child token)
//!                  │
//!   welcome → log / frame → FrameIngest → FrameSink / pong, other → ignore
//! ```
//!
//! The keepalive task is cancelled and joined on every exit path before
//! the connectivity flag is cleared.

use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, trace, warn};

use crate::connector::Transport;
use crate::error::ClientError;
use crate::ingest::FrameIngest;
use crate::keepalive::KeepaliveAgent;
use crate::message::ServerMessage;
use crate::status::{ClientStatus, Liveness};

// ── SessionEnd ───────────────────────────────────────────────────

/// Why a session's read loop stopped.
#[derive(Debug)]
pub enum SessionEnd {
    /// The peer closed the stream.
    Closed,
    /// The transport failed mid-session.
    TransportError(tungstenite::Error),
    /// The liveness flag was cleared.
    Shutdown,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed by peer"),
            Self::TransportError(e) => write!(f, "transport error: {e}"),
            Self::Shutdown => write!(f, "shutdown requested"),
        }
    }
}

/// Per-session message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Messages successfully parsed.
    pub messages: u64,
    /// Messages that failed to parse.
    pub invalid: u64,
    /// Frames accepted by the decoder.
    pub frames: u64,
    /// Frame payloads the decoder rejected.
    pub dropped_frames: u64,
    /// Keepalive pings sent.
    pub pings: u64,
}

// ── ConnectionSession ────────────────────────────────────────────

/// Drives a single connection until it closes or the client shuts down.
pub struct ConnectionSession {
    ingest: FrameIngest,
    status: ClientStatus,
    liveness: Liveness,
    keepalive_interval: Duration,
    stats: SessionStats,
}

impl ConnectionSession {
    pub fn new(
        ingest: FrameIngest,
        status: ClientStatus,
        liveness: Liveness,
        keepalive_interval: Duration,
    ) -> Self {
        Self {
            ingest,
            status,
            liveness,
            keepalive_interval,
            stats: SessionStats::default(),
        }
    }

    /// The liveness flag this session observes.
    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Counters of the most recent (or current) session.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Run the session on an established transport.
    ///
    /// Never fails: mid-session errors end the session and are reported
    /// through [`SessionEnd`].
    pub async fn handle<T: Transport>(&mut self, transport: T) -> SessionEnd {
        self.stats = SessionStats::default();
        self.status.set_connected(true);
        info!("connected to frame publisher");

        let (sink, mut stream) = transport.split();
        let cancel = self.liveness.child_token();
        let keepalive = KeepaliveAgent::new(self.keepalive_interval, self.status.clone())
            .spawn(sink, cancel.clone());

        let end = loop {
            let next = tokio::select! {
                biased;
                _ = self.liveness.cleared() => break SessionEnd::Shutdown,
                next = stream.next() => next,
            };
            match next {
                None => break SessionEnd::Closed,
                Some(Err(e)) => break classify(e),
                Some(Ok(message)) => self.on_message(message),
            }
        };

        cancel.cancel();
        match keepalive.await {
            Ok(pings) => self.stats.pings = pings,
            Err(e) if e.is_panic() => warn!(error = %e, "keepalive task panicked"),
            Err(_) => {}
        }
        self.status.set_connected(false);

        info!(
            reason = %end,
            messages = self.stats.messages,
            frames = self.stats.frames,
            invalid = self.stats.invalid,
            "session ended"
        );
        end
    }

    fn on_message(&mut self, message: Message) {
        let parsed = match message {
            Message::Text(text) => ServerMessage::parse(text.as_str()),
            Message::Binary(bytes) => ServerMessage::parse_bytes(&bytes),
            Message::Close(frame) => {
                debug!(?frame, "publisher sent close");
                return;
            }
            // Control frames are answered by tungstenite itself.
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return,
        };

        match parsed {
            Ok(message) => {
                self.stats.messages += 1;
                trace!(kind = message.kind(), "message received");
                self.dispatch(message);
            }
            Err(e) => self.on_invalid(e),
        }
    }

    fn dispatch(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Welcome { message } => {
                info!(greeting = %message, "publisher welcome");
            }
            ServerMessage::Frame { data } => {
                if data.is_empty() {
                    return;
                }
                match self.ingest.ingest(&data) {
                    Some(seq) => {
                        self.stats.frames += 1;
                        trace!(seq, "frame queued");
                    }
                    None => self.stats.dropped_frames += 1,
                }
            }
            ServerMessage::Pong => trace!("pong"),
            ServerMessage::Unknown => debug!("ignoring message with unknown type"),
        }
    }

    fn on_invalid(&mut self, error: ClientError) {
        self.stats.invalid += 1;
        warn!(error = %error, "received invalid message");
    }
}

fn classify(error: tungstenite::Error) -> SessionEnd {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            SessionEnd::Closed
        }
        other => SessionEnd::TransportError(other),
    }
}

// ── Tests ────────────────────────────────────────────────────────
