//! Bounded drop-oldest hand-off between the network side and the renderer.
//!
//! The producer (the connection session, on the tokio runtime) never
//! blocks: when the queue is full the oldest entry is evicted to make room.
//! The consumer (the render thread) waits on a condition variable for at
//! most the poll timeout and gets `None` back if nothing arrived.
//!
//! ```text
//!  put(f7) on a full sink of capacity 5:
//!
//!  [f2 f3 f4 f5 f6]  ──evict f2──►  [f3 f4 f5 f6]  ──push──►  [f3 f4 f5 f6 f7]
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::decoder::DecodedImage;

/// Default number of frames buffered ahead of the renderer.
pub const DEFAULT_CAPACITY: usize = 5;

// ── Frame ────────────────────────────────────────────────────────

/// A decoded frame waiting to be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Process-wide sequence number assigned at decode time.
    pub seq: u64,
    /// The decoded pixels.
    pub image: DecodedImage,
}

/// The sink type used between the session and the renderer.
pub type FrameSink = BoundedSink<Frame>;

// ── BoundedSink ──────────────────────────────────────────────────

/// Fixed-capacity FIFO with drop-oldest overflow.
///
/// Safe for one producer and one consumer on different threads.
#[derive(Debug)]
pub struct BoundedSink<T> {
    queue: Mutex<VecDeque<T>>,
    available: Condvar,
    capacity: usize,
    evicted: AtomicU64,
}

impl<T> BoundedSink<T> {
    /// Create a sink holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
            evicted: AtomicU64::new(0),
        }
    }

    /// Insert `item`, evicting the oldest entry if the sink is full.
    ///
    /// Never blocks beyond the short critical section. Returns the evicted
    /// item, if any. The inserted item itself is never discarded.
    pub fn put(&self, item: T) -> Option<T> {
        let evicted = {
            let mut queue = self.lock();
            let evicted = if queue.len() >= self.capacity {
                // A consumer may have drained it already; then nothing to evict.
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(item);
            evicted
        };
        if evicted.is_some() {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        self.available.notify_one();
        evicted
    }

    /// Remove the oldest item, waiting up to `timeout` for one to arrive.
    ///
    /// `None` means the wait elapsed with the sink empty; callers re-poll.
    pub fn take(&self, timeout: Duration) -> Option<T> {
        let queue = self.lock();
        let (mut queue, _) = self
            .available
            .wait_timeout_while(queue, timeout, |q| q.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        queue.pop_front()
    }

    /// Remove and return everything currently buffered, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the sink is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of buffered items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total items discarded by drop-oldest eviction.
    pub fn evicted_count(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // Queue operations cannot leave the deque inconsistent.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for BoundedSink<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ── Tests ────────────────────────────────────────────────────────
