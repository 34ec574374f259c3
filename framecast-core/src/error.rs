//! Domain-specific error types for the framecast client.
//!
//! All fallible operations return `Result<T, ClientError>`.
//! No panics on invalid input; every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

use tokio_tungstenite::tungstenite;

/// The canonical error type for the framecast client.
#[derive(Debug, Error)]
pub enum ClientError {
    // ── Transport Errors ─────────────────────────────────────────
    /// The WebSocket layer reported an error (refused, reset, handshake...).
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// Connection establishment exceeded its deadline.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    // ── Message Errors ───────────────────────────────────────────
    /// An inbound message was not valid protocol JSON.
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    /// A binary message was not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    // ── Frame Errors ─────────────────────────────────────────────
    /// The frame payload was not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The frame decoder rejected the payload.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

// ── DecodeError ───────────────────────────────────────────────────

/// Typed error for [`FrameDecoder`](crate::decoder::FrameDecoder)
/// implementations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The buffer is shorter than the image header.
    #[error("truncated frame: {len} bytes (need at least {min})")]
    Truncated { len: usize, min: usize },

    /// Width or height is zero.
    #[error("empty image dimensions {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    /// Width or height exceeds the accepted maximum.
    #[error("image dimensions {width}x{height} exceed {max}")]
    TooLarge { width: u32, height: u32, max: u32 },

    /// Decompressed pixel data does not match the header dimensions.
    #[error("pixel buffer size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The compressed stream itself is corrupt.
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// A JPEG/PNG payload could not be decoded.
    #[error("image decode failed: {0}")]
    Image(String),
}
