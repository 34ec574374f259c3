//! Headless renderer: validates frames and logs stream statistics.
//!
//! Stands in for a windowed renderer on machines without a display. It
//! checks every pixel buffer against its dimensions and reports
//! connection state, frame count, fps and resolution at a fixed cadence.

use std::time::{Duration, Instant};

use tracing::info;

use framecast_core::{DecodedImage, FrameMeta, Renderer};

/// Logs one status line per `interval`.
pub struct LogRenderer {
    interval: Duration,
    last_report: Option<Instant>,
    shown: u64,
}

impl LogRenderer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_report: None,
            shown: 0,
        }
    }
}

impl Renderer for LogRenderer {
    fn display(&mut self, image: &DecodedImage, meta: &FrameMeta) -> Result<(), String> {
        if image.data.is_empty() {
            return Ok(());
        }

        let expected = DecodedImage::byte_len(image.width, image.height);
        if image.data.len() < expected {
            return Err(format!(
                "frame buffer too small: {} < {}",
                image.data.len(),
                expected,
            ));
        }
        self.shown += 1;

        let now = Instant::now();
        let due = self
            .last_report
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if due {
            self.last_report = Some(now);
            info!(
                status = if meta.connected { "Connected" } else { "Disconnected" },
                frame = meta.frame_count,
                shown = self.shown,
                fps = format_args!("{:.1}", meta.fps),
                resolution = format_args!("{}x{}", image.width, image.height),
                "stream"
            );
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
