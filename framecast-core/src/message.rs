//! JSON wire protocol spoken with the frame publisher.
//!
//! # Wire Protocol
//!
//! ```text
//! Publisher ──[{"type":"welcome","message":"..."}]──► Client
//! Publisher ──[{"type":"frame","data":"<base64>"}]──► Client   (repeated)
//! Publisher ──[{"type":"pong"}]─────────────────────► Client
//!
//! Client    ──[{"type":"ping","timestamp":<f64>}]───► Publisher (every 30s)
//! ```
//!
//! Messages travel as WebSocket text frames. Binary frames carrying UTF-8
//! JSON are accepted as well.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

// ── ServerMessage ─────────────────────────────────────────────────

/// A message received from the publisher, classified by its `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Greeting sent once after the connection opens.
    Welcome {
        #[serde(default)]
        message: String,
    },

    /// One encoded video frame.
    Frame {
        /// Base64-encoded compressed image. Empty means "no frame".
        #[serde(default)]
        data: String,
    },

    /// Reply to a client `ping`. Not correlated with any ping.
    Pong,

    /// Any other tag. Ignored by the session.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Parse a text message.
    ///
    /// A JSON object without a string `type` is treated like an unknown
    /// tag. Anything that is not a JSON object is an error.
    pub fn parse(text: &str) -> Result<Self, ClientError> {
        match serde_json::from_str(text) {
            Ok(message) => Ok(message),
            Err(e) if e.is_data() && lacks_string_tag(text) => Ok(Self::Unknown),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse a binary message holding UTF-8 JSON.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, ClientError> {
        Self::parse(std::str::from_utf8(bytes)?)
    }

    /// Short tag name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::Frame { .. } => "frame",
            Self::Pong => "pong",
            Self::Unknown => "unknown",
        }
    }
}

/// Only the tag of an inbound object.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    tag: Option<serde_json::Value>,
}

fn lacks_string_tag(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .filter(serde_json::Value::is_object)
        .and_then(|value| serde_json::from_value::<Envelope>(value).ok())
        .is_some_and(|envelope| !matches!(envelope.tag, Some(serde_json::Value::String(_))))
}

// ── ClientMessage ─────────────────────────────────────────────────

/// A message sent to the publisher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Keepalive ping carrying wall-clock seconds since the Unix epoch.
    Ping { timestamp: f64 },
}

impl ClientMessage {
    /// A ping stamped with the current wall-clock time.
    pub fn ping_now() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self::Ping { timestamp }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String, ClientError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Tests ────────────────────────────────────────────────────────
