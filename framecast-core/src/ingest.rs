//! Frame ingestion: base64 payload → decoder → sequence number → sink.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use crate::decoder::FrameDecoder;
use crate::error::ClientError;
use crate::sink::{Frame, FrameSink};
use crate::status::ClientStatus;

/// Decodes incoming frame payloads and hands them to the sink.
pub struct FrameIngest {
    decoder: Box<dyn FrameDecoder>,
    sink: Arc<FrameSink>,
    status: ClientStatus,
}

impl FrameIngest {
    pub fn new(decoder: Box<dyn FrameDecoder>, sink: Arc<FrameSink>, status: ClientStatus) -> Self {
        Self {
            decoder,
            sink,
            status,
        }
    }

    /// Decode and enqueue one payload.
    ///
    /// Failures are logged and the frame is dropped; they never reach the
    /// session. Returns the assigned sequence number on success.
    pub fn ingest(&mut self, encoded: &str) -> Option<u64> {
        match self.try_ingest(encoded) {
            Ok(seq) => Some(seq),
            Err(e) => {
                warn!(error = %e, payload_len = encoded.len(), "failed to decode frame");
                None
            }
        }
    }

    fn try_ingest(&mut self, encoded: &str) -> Result<u64, ClientError> {
        let bytes = STANDARD.decode(encoded)?;
        let image = self.decoder.decode(&bytes)?;

        let seq = self.status.next_frame_seq();
        if let Some(old) = self.sink.put(Frame { seq, image }) {
            debug!(seq, evicted = old.seq, "sink full, dropped oldest frame");
        }
        Ok(seq)
    }
}

// ── Tests ────────────────────────────────────────────────────────
