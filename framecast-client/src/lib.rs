//! # framecast-client: streaming video viewer
//!
//! Connects to a frame publisher over WebSocket, decodes incoming frames
//! and renders them on a dedicated thread while the reconnect supervisor
//! keeps the connection alive.

pub mod config;
pub mod display;
