//! # framecast-core
//!
//! Connection lifecycle and frame delivery pipeline of the framecast
//! streaming-video client.
//!
//! This crate contains:
//! - **Messages**: `ServerMessage` / `ClientMessage`, the JSON wire protocol
//! - **Sink**: `BoundedSink`, a drop-oldest SPSC hand-off to the renderer
//! - **Decoder**: `FrameDecoder` contract, JPEG/PNG and raw zstd decoders
//! - **Ingest**: base64 → decode → sequence number → sink
//! - **Keepalive**: `KeepaliveAgent`, periodic `ping` per session
//! - **Session**: `ConnectionSession`, read loop and message dispatch
//! - **Supervisor**: `ReconnectSupervisor`, bounded retries in an outer loop
//! - **Render**: `RenderLoop` driving a `Renderer` on its own thread
//! - **Error**: `ClientError`: typed, `thiserror`-based error hierarchy

pub mod connector;
pub mod decoder;
pub mod error;
pub mod ingest;
pub mod keepalive;
pub mod message;
pub mod render;
pub mod session;
pub mod sink;
pub mod status;
pub mod supervisor;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use connector::{Connector, Transport, WsConnector, WsStream};
pub use decoder::{DecodedImage, FrameDecoder, ImageFrameDecoder, ZstdFrameDecoder, encode_frame};
pub use error::{ClientError, DecodeError};
pub use ingest::FrameIngest;
pub use keepalive::KeepaliveAgent;
pub use message::{ClientMessage, ServerMessage};
pub use render::{FpsCounter, FrameMeta, RenderLoop, Renderer};
pub use session::{ConnectionSession, SessionEnd, SessionStats};
pub use sink::{BoundedSink, Frame, FrameSink};
pub use status::{ClientStatus, Liveness};
pub use supervisor::{ConnectOutcome, ReconnectPolicy, ReconnectSupervisor};
