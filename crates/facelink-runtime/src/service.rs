//! Service facade - receiver, queue, and dispatch tick as one unit
//!
//! The service is an explicitly constructed, explicitly owned instance
//! the host application starts and stops; there is no process-wide
//! state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use facelink_core::{FaceLinkResult, Frame, FrameSink};
use facelink_transport::{LinkState, ReceiverConfig, UdpReceiver};

use crate::{Dispatcher, FrameQueue};

/// Service configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Socket and link configuration
    pub receiver: ReceiverConfig,
    /// Period of the queue-draining dispatch tick
    pub tick_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            receiver: ReceiverConfig::default(),
            tick_interval: Duration::from_millis(10),
        }
    }
}

/// Facial-capture service: UDP receiver feeding a hand-off queue that a
/// periodic tick drains into subscriber callbacks.
///
/// Exactly two long-lived tasks run while started: the receive loop and
/// the dispatch tick. The queue is the only memory they share.
pub struct MocapService {
    config: ServiceConfig,
    queue: Arc<FrameQueue>,
    dispatcher: Arc<Dispatcher>,
    receiver: UdpReceiver,
    ticker: Option<JoinHandle<()>>,
}

impl MocapService {
    /// Create a service with default configuration
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    /// Create a service with custom configuration
    pub fn with_config(config: ServiceConfig) -> Self {
        MocapService {
            receiver: UdpReceiver::with_config(config.receiver.clone()),
            config,
            queue: Arc::new(FrameQueue::new()),
            dispatcher: Arc::new(Dispatcher::new()),
            ticker: None,
        }
    }

    /// Subscriber registration handle
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Current link state
    pub fn link_state(&self) -> LinkState {
        self.receiver.state()
    }

    /// Bound address while started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.receiver.local_addr()
    }

    /// Undispatched backlog size
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Open the socket and start the dispatch tick.
    ///
    /// A started service is restarted: the previous socket and tick are
    /// torn down first.
    pub async fn start(&mut self) -> FaceLinkResult<()> {
        self.stop().await;

        self.receiver
            .open(Arc::clone(&self.queue) as Arc<dyn FrameSink>)
            .await?;

        let queue = Arc::clone(&self.queue);
        let dispatcher = Arc::clone(&self.dispatcher);
        let period = self.config.tick_interval;
        self.ticker = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            loop {
                tick.tick().await;
                dispatcher.dispatch_pending(&queue);
            }
        }));

        tracing::info!(
            "capture service listening on port {}",
            self.config.receiver.port
        );
        Ok(())
    }

    /// Close the socket, stop the tick, and drop any undispatched
    /// frames. Idempotent.
    pub async fn stop(&mut self) {
        self.receiver.close().await;
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            let _ = ticker.await;
        }
        self.queue.clear();
    }
}

impl Default for MocapService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MocapService {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

/// Default subscriber: logs a one-line frame summary.
pub fn log_frame(frame: &Frame) {
    tracing::debug!(
        "frame: {} blendshapes, head rotation {:?}",
        frame.blendshapes.len(),
        frame.head.as_ref().map(|p| p.rotation),
    );
}
