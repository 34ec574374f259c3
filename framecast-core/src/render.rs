//! Consumer side of the frame sink.
//!
//! The render loop runs on its own OS thread, polls the sink with a short
//! timeout and hands each frame to a [`Renderer`]. It is the only place the
//! user can stop the client from: a renderer that reports a shutdown
//! request clears the liveness flag.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::decoder::DecodedImage;
use crate::sink::FrameSink;
use crate::status::{ClientStatus, Liveness};

/// Default wait for a frame before re-polling.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

// ── FrameMeta ────────────────────────────────────────────────────

/// Status shown alongside a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMeta {
    /// Whether a session is currently established.
    pub connected: bool,
    /// Frames decoded so far, process-wide.
    pub frame_count: u64,
    /// Sequence number of this frame.
    pub seq: u64,
    /// Displayed frames per second over the last full window.
    pub fps: f64,
}

// ── Renderer ─────────────────────────────────────────────────────

/// Displays frames. Implementations own the window / output surface.
pub trait Renderer {
    /// Show one frame.
    fn display(&mut self, image: &DecodedImage, meta: &FrameMeta) -> Result<(), String>;

    /// Whether the user asked to quit. Polled after every sink poll.
    fn shutdown_requested(&mut self) -> bool {
        false
    }
}

// ── FpsCounter ───────────────────────────────────────────────────

/// Frames-per-second over windows of at least one second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f64,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count one displayed frame and return the current rate.
    pub fn tick(&mut self, now: Instant) -> f64 {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= Duration::from_secs(1) {
            self.fps = f64::from(self.frames) / elapsed.as_secs_f64();
            self.frames = 0;
            self.window_start = now;
        }
        self.fps
    }
}

// ── RenderLoop ───────────────────────────────────────────────────

/// Polls the sink and drives a renderer until the liveness flag clears.
#[derive(Debug, Clone)]
pub struct RenderLoop {
    sink: Arc<FrameSink>,
    status: ClientStatus,
    liveness: Liveness,
    poll_timeout: Duration,
}

impl RenderLoop {
    pub fn new(
        sink: Arc<FrameSink>,
        status: ClientStatus,
        liveness: Liveness,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            sink,
            status,
            liveness,
            poll_timeout,
        }
    }

    /// Start the loop on a dedicated thread.
    ///
    /// The handle yields the number of frames displayed.
    pub fn spawn<R>(self, mut renderer: R) -> std::io::Result<JoinHandle<u64>>
    where
        R: Renderer + Send + 'static,
    {
        std::thread::Builder::new()
            .name("framecast-render".into())
            .spawn(move || self.run(&mut renderer))
    }

    /// Run the loop on the current thread.
    pub fn run<R: Renderer + ?Sized>(&self, renderer: &mut R) -> u64 {
        let mut fps = FpsCounter::new(Instant::now());
        let mut displayed = 0u64;
        debug!(poll_timeout = ?self.poll_timeout, "render loop started");

        while self.liveness.is_alive() {
            if let Some(frame) = self.sink.take(self.poll_timeout) {
                let meta = FrameMeta {
                    connected: self.status.is_connected(),
                    frame_count: self.status.frame_count(),
                    seq: frame.seq,
                    fps: fps.tick(Instant::now()),
                };
                match renderer.display(&frame.image, &meta) {
                    Ok(()) => displayed += 1,
                    Err(e) => warn!(error = %e, seq = frame.seq, "render error"),
                }
            }

            if renderer.shutdown_requested() {
                info!("shutdown requested by user");
                self.liveness.shutdown();
                break;
            }
        }

        debug!(displayed, "render loop stopped");
        displayed
    }
}

// ── Tests ────────────────────────────────────────────────────────
