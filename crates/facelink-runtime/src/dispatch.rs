//! Frame dispatcher - fan-out to registered subscribers
//!
//! Each drained frame goes to every subscriber in registration order.
//! Failures are contained per callback: a panicking handler is logged
//! and skipped without affecting other subscribers, the rest of the
//! frame's deliveries, or later dispatch cycles.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use facelink_core::Frame;

use crate::FrameQueue;

/// Handle for removing a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Dispatch counters
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchStats {
    /// Frames taken off the queue and fanned out
    pub frames_dispatched: u64,
    /// Successful subscriber invocations
    pub deliveries: u64,
    /// Subscriber invocations that panicked and were contained
    pub subscriber_failures: u64,
}

#[derive(Clone)]
struct Subscriber {
    id: SubscriberId,
    handler: Arc<dyn Fn(&Frame) + Send + Sync>,
}

/// Delivers queued frames to subscribers.
///
/// Handlers run synchronously on the dispatch tick and must not block
/// for long periods. Registration and removal are allowed at any time,
/// including from inside a handler; a subscriber removed mid-cycle may
/// still see the frame currently being delivered.
#[derive(Default)]
pub struct Dispatcher {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    stats: Mutex<DispatchStats>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame handler. Returns the handle used to remove it.
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push(Subscriber {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove a subscriber. Returns `false` when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Drain every frame currently pending and deliver each to all
    /// subscribers in FIFO order. With no subscribers registered the
    /// drained frames are simply discarded.
    pub fn dispatch_pending(&self, queue: &FrameQueue) {
        while let Some(frame) = queue.try_pop() {
            self.dispatch(&frame);
        }
    }

    /// Deliver one frame to every subscriber in registration order.
    pub fn dispatch(&self, frame: &Frame) {
        // Snapshot so handlers may subscribe/unsubscribe reentrantly.
        let snapshot: Vec<Subscriber> = self.subscribers.lock().clone();

        let mut delivered = 0u64;
        let mut failed = 0u64;
        for subscriber in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| (subscriber.handler)(frame))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    failed += 1;
                    tracing::error!(
                        "subscriber {:?} panicked while handling a frame",
                        subscriber.id
                    );
                }
            }
        }

        let mut stats = self.stats.lock();
        stats.frames_dispatched += 1;
        stats.deliveries += delivered;
        stats.subscriber_failures += failed;
    }

    pub fn stats(&self) -> DispatchStats {
        *self.stats.lock()
    }
}
