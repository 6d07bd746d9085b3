//! UDP receiver implementation
//!
//! Owns one socket for the lifetime of the link and feeds decoded frames
//! into a [`FrameSink`] from a dedicated background task. The receive
//! loop never runs on, or blocks, the caller's context.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use facelink_core::{FaceLinkError, FaceLinkResult, FrameSink};
use facelink_wire::{decode, DEFAULT_PORT, HANDSHAKE_ACK};

/// Largest UDP payload the capture app can send
const MAX_DATAGRAM_SIZE: usize = 65535;

/// Receiver configuration
#[derive(Clone, Debug)]
pub struct ReceiverConfig {
    /// Local UDP port to bind
    pub port: u16,
    /// Port on the sender's host the handshake acknowledgment goes to
    pub reply_port: u16,
    /// Upper bound on one blocking receive; also bounds how long
    /// [`UdpReceiver::close`] waits for the loop to notice shutdown
    pub recv_timeout: Duration,
    /// Pause after a socket-level failure before the loop resumes
    pub backoff: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            port: DEFAULT_PORT,
            reply_port: DEFAULT_PORT,
            recv_timeout: Duration::from_secs(1),
            backoff: Duration::from_secs(2),
        }
    }
}

/// Connection handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No socket open, or the link dropped after a socket failure
    Disconnected,
    /// Socket bound, no capture app has sent anything yet
    AwaitingFirstDatagram,
    /// Handshake acknowledged, datagrams are flowing
    Connected,
}

/// UDP receiver for capture datagrams.
///
/// `open` binds the configured port and starts the receive loop on a
/// background task; `close` stops the loop and releases the socket.
/// Dropping an open receiver signals the loop to stop without waiting
/// for it (asynchronous teardown); call `close` for a synchronous join.
pub struct UdpReceiver {
    config: ReceiverConfig,
    state: Arc<Mutex<LinkState>>,
    local_addr: Option<SocketAddr>,
    worker: Option<ReceiverWorker>,
}

struct ReceiverWorker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl UdpReceiver {
    /// Create a receiver with default configuration
    pub fn new() -> Self {
        Self::with_config(ReceiverConfig::default())
    }

    /// Create a receiver with custom configuration
    pub fn with_config(config: ReceiverConfig) -> Self {
        UdpReceiver {
            config,
            state: Arc::new(Mutex::new(LinkState::Disconnected)),
            local_addr: None,
            worker: None,
        }
    }

    /// Current handshake state
    pub fn state(&self) -> LinkState {
        *self.state.lock()
    }

    /// Bound address while open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the configured port and start the receive loop.
    ///
    /// An already-open receiver is closed first; sockets are never
    /// double-bound.
    pub async fn open(&mut self, sink: Arc<dyn FrameSink>) -> FaceLinkResult<()> {
        self.close().await;

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.config.port);
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| FaceLinkError::Transport(e.to_string()))?;
        self.local_addr = Some(
            socket
                .local_addr()
                .map_err(|e| FaceLinkError::Transport(e.to_string()))?,
        );

        *self.state.lock() = LinkState::AwaitingFirstDatagram;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let receive_loop = ReceiveLoop {
            socket,
            sink,
            state: Arc::clone(&self.state),
            config: self.config.clone(),
        };
        let handle = tokio::spawn(receive_loop.run(shutdown_rx));

        self.worker = Some(ReceiverWorker { shutdown, handle });
        Ok(())
    }

    /// Stop the receive loop and release the socket.
    ///
    /// Waits for the background task to terminate; the loop observes
    /// shutdown within one receive-timeout interval. Calling this while
    /// not open is a no-op.
    pub async fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.shutdown.send(true);
        let _ = worker.handle.await;
        self.local_addr = None;
        *self.state.lock() = LinkState::Disconnected;
    }
}

impl Default for UdpReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UdpReceiver {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown.send(true);
        }
    }
}

struct ReceiveLoop {
    socket: UdpSocket,
    sink: Arc<dyn FrameSink>,
    state: Arc<Mutex<LinkState>>,
    config: ReceiverConfig,
}

impl ReceiveLoop {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        while !*shutdown.borrow() {
            match timeout(self.config.recv_timeout, self.socket.recv_from(&mut buf)).await {
                // Receive timeout: go around and re-check shutdown.
                Err(_) => continue,
                Ok(Ok((len, sender))) => self.on_datagram(&buf[..len], sender).await,
                Ok(Err(e)) => self.on_socket_error(e, &mut shutdown).await,
            }
        }
    }

    async fn on_datagram(&self, data: &[u8], sender: SocketAddr) {
        if *self.state.lock() != LinkState::Connected {
            self.acknowledge(sender).await;
        }

        let payload = String::from_utf8_lossy(data);
        match decode(&payload) {
            Ok(frame) => self.sink.deliver(frame),
            Err(e) => {
                // One malformed datagram must not take the session down.
                tracing::warn!("dropping undecodable datagram ({} bytes): {}", data.len(), e);
            }
        }
    }

    /// One-time-per-connection handshake confirmation, sent to the
    /// sender's host on the configured reply port.
    async fn acknowledge(&self, sender: SocketAddr) {
        let reply = SocketAddr::new(sender.ip(), self.config.reply_port);
        match self.socket.send_to(HANDSHAKE_ACK.as_bytes(), reply).await {
            Ok(_) => {
                tracing::info!("capture app connected from {}", sender.ip());
                *self.state.lock() = LinkState::Connected;
            }
            Err(e) => {
                // Stay unconnected; the next datagram retries.
                tracing::warn!("handshake acknowledgment to {} failed: {}", reply, e);
            }
        }
    }

    async fn on_socket_error(&self, error: std::io::Error, shutdown: &mut watch::Receiver<bool>) {
        // Quiet until a capture app has actually connected; an idle
        // receiver should not spam the log.
        if *self.state.lock() == LinkState::Connected {
            tracing::warn!("socket failure, backing off: {}", error);
        }
        *self.state.lock() = LinkState::Disconnected;

        // Fixed backoff, cut short by shutdown. The socket is not
        // rebound.
        let _ = timeout(self.config.backoff, shutdown.changed()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use facelink_core::Frame;

    #[derive(Default)]
    struct CollectSink {
        frames: Mutex<Vec<Frame>>,
    }

    impl CollectSink {
        fn len(&self) -> usize {
            self.frames.lock().len()
        }
    }

    impl FrameSink for CollectSink {
        fn deliver(&self, frame: Frame) {
            self.frames.lock().push(frame);
        }
    }

    fn test_config(reply_port: u16) -> ReceiverConfig {
        ReceiverConfig {
            port: 0,
            reply_port,
            recv_timeout: Duration::from_millis(50),
            backoff: Duration::from_millis(50),
        }
    }

    fn frame_payload(value: f32) -> String {
        format!("jawOpen-{value}=head#1,2,3")
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test]
    async fn test_open_and_close_lifecycle() {
        let sink = Arc::new(CollectSink::default());
        let mut receiver = UdpReceiver::with_config(test_config(0));

        assert_eq!(receiver.state(), LinkState::Disconnected);

        receiver.open(Arc::clone(&sink) as Arc<dyn FrameSink>).await.unwrap();
        assert_eq!(receiver.state(), LinkState::AwaitingFirstDatagram);
        assert_ne!(receiver.local_addr().unwrap().port(), 0);

        receiver.close().await;
        assert_eq!(receiver.state(), LinkState::Disconnected);
        assert!(receiver.local_addr().is_none());

        // Idempotent.
        receiver.close().await;
        assert_eq!(receiver.state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn test_handshake_once_then_frames_flow_in_order() {
        let app = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let reply_port = app.local_addr().unwrap().port();

        let sink = Arc::new(CollectSink::default());
        let mut receiver = UdpReceiver::with_config(test_config(reply_port));
        receiver.open(Arc::clone(&sink) as Arc<dyn FrameSink>).await.unwrap();
        let dest = ("127.0.0.1", receiver.local_addr().unwrap().port());

        app.send_to(frame_payload(1.0).as_bytes(), dest).await.unwrap();

        // First datagram triggers exactly one acknowledgment.
        let mut buf = [0u8; 128];
        let (len, _) = timeout(Duration::from_secs(2), app.recv_from(&mut buf))
            .await
            .expect("no handshake acknowledgment")
            .unwrap();
        assert_eq!(&buf[..len], HANDSHAKE_ACK.as_bytes());
        wait_until(|| receiver.state() == LinkState::Connected).await;

        app.send_to(frame_payload(2.0).as_bytes(), dest).await.unwrap();
        wait_until(|| sink.len() == 2).await;

        // Delivery in datagram order, and no second acknowledgment.
        let values: Vec<f32> = sink
            .frames
            .lock()
            .iter()
            .map(|f| f.blendshape("jawOpen").unwrap())
            .collect();
        assert_eq!(values, vec![1.0, 2.0]);
        assert!(
            timeout(Duration::from_millis(200), app.recv_from(&mut buf))
                .await
                .is_err()
        );

        receiver.close().await;
    }

    #[tokio::test]
    async fn test_malformed_datagram_does_not_kill_loop() {
        let app = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let sink = Arc::new(CollectSink::default());
        let mut receiver =
            UdpReceiver::with_config(test_config(app.local_addr().unwrap().port()));
        receiver.open(Arc::clone(&sink) as Arc<dyn FrameSink>).await.unwrap();
        let dest = ("127.0.0.1", receiver.local_addr().unwrap().port());

        app.send_to(b"definitely not a packet", dest).await.unwrap();
        app.send_to(b"=head#1,2", dest).await.unwrap();
        app.send_to(frame_payload(1.0).as_bytes(), dest).await.unwrap();

        wait_until(|| sink.len() == 1).await;
        assert_eq!(receiver.state(), LinkState::Connected);

        receiver.close().await;
    }

    #[tokio::test]
    async fn test_close_releases_port_and_stops_enqueue() {
        let app = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let sink = Arc::new(CollectSink::default());
        let mut receiver =
            UdpReceiver::with_config(test_config(app.local_addr().unwrap().port()));
        receiver.open(Arc::clone(&sink) as Arc<dyn FrameSink>).await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        app.send_to(frame_payload(1.0).as_bytes(), ("127.0.0.1", port))
            .await
            .unwrap();
        wait_until(|| sink.len() == 1).await;

        receiver.close().await;

        // The port is free again, and late datagrams no longer reach the
        // sink.
        let rebound = UdpSocket::bind(("0.0.0.0", port)).await.unwrap();
        app.send_to(frame_payload(2.0).as_bytes(), ("127.0.0.1", port))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.len(), 1);
        drop(rebound);
    }

    #[tokio::test]
    async fn test_reopen_does_not_double_bind() {
        let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let sink = Arc::new(CollectSink::default());
        let mut config = test_config(0);
        config.port = port;
        let mut receiver = UdpReceiver::with_config(config);

        receiver.open(Arc::clone(&sink) as Arc<dyn FrameSink>).await.unwrap();
        // A second open implicitly closes the first socket; binding the
        // same fixed port again would fail otherwise.
        receiver.open(Arc::clone(&sink) as Arc<dyn FrameSink>).await.unwrap();
        assert_eq!(receiver.local_addr().unwrap().port(), port);

        receiver.close().await;
    }
}
