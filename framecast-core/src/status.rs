//! Flags shared between the network tasks and the render thread.
//!
//! - [`Liveness`]: process-wide "keep operating" signal. Cleared on
//!   terminal failure or user shutdown; every loop in the client observes it.
//! - [`ClientStatus`]: connectivity flag and the decoded-frame counter.
//!
//! Both are cheap to clone and safe to read from any thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

// ── Liveness ─────────────────────────────────────────────────────

/// The single cooperative cancellation signal of the client.
///
/// Backed by a [`CancellationToken`] so async waits can race against it
/// while the render thread just polls [`is_alive`](Self::is_alive).
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    token: CancellationToken,
}

impl Liveness {
    /// A new, live flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the client should keep operating.
    pub fn is_alive(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Clear the flag. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Resolves once the flag has been cleared.
    pub async fn cleared(&self) {
        self.token.cancelled().await;
    }

    /// A token cancelled when the flag clears, and also cancellable on
    /// its own without clearing the flag.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Sleep for `duration`, returning early if the flag clears.
    ///
    /// Returns `true` if the full duration elapsed.
    pub async fn sleep(&self, duration: std::time::Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.token.cancelled() => false,
        }
    }
}

// ── ClientStatus ─────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StatusInner {
    connected: AtomicBool,
    frame_count: AtomicU64,
}

/// Connectivity flag and frame counter, shared across threads.
#[derive(Debug, Clone, Default)]
pub struct ClientStatus {
    inner: Arc<StatusInner>,
}

impl ClientStatus {
    /// Fresh status: disconnected, zero frames.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transport session is currently established.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Set the connectivity flag.
    pub fn set_connected(&self, connected: bool) {
        self.inner.connected.store(connected, Ordering::SeqCst);
    }

    /// Number of frames successfully decoded so far.
    pub fn frame_count(&self) -> u64 {
        self.inner.frame_count.load(Ordering::SeqCst)
    }

    /// Claim the next frame sequence number (0, 1, 2, ...).
    pub fn next_frame_seq(&self) -> u64 {
        self.inner.frame_count.fetch_add(1, Ordering::SeqCst)
    }
}

// ── Tests ────────────────────────────────────────────────────────
