//! Hand-off queue between the network task and the dispatch tick
//!
//! The queue is the only memory shared between the two long-lived
//! tasks; all access is serialized by its internal mutex. Frames move
//! through whole: owned by the producer until pushed, by the consumer
//! after popped.

use std::collections::VecDeque;

use parking_lot::Mutex;

use facelink_core::{Frame, FrameSink};

/// Mutex-guarded FIFO of decoded frames.
///
/// Designed for exactly one producer (the UDP receiver) and one
/// consumer (the dispatcher). Unbounded: a stalled consumer grows the
/// backlog, which `len` exposes for hosts that want to watch it.
#[derive(Default)]
pub struct FrameQueue {
    inner: Mutex<VecDeque<Frame>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame. Never blocks beyond the critical section.
    pub fn push(&self, frame: Frame) {
        self.inner.lock().push_back(frame);
    }

    /// Remove and return the oldest frame, if any. Never blocks.
    pub fn try_pop(&self) -> Option<Frame> {
        self.inner.lock().pop_front()
    }

    /// Non-blocking emptiness hint. The answer may be stale by the time
    /// the caller acts on it; `try_pop` is the authoritative check.
    pub fn has_pending(&self) -> bool {
        !self.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Number of frames waiting for dispatch
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Atomically discard all pending frames
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl FrameSink for FrameQueue {
    fn deliver(&self, frame: Frame) {
        self.push(frame);
    }
}
