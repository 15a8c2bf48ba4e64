//! Common test utilities for IoTransit integration tests
//!
//! - `MockConnector` / `MockPeer`: scripted in-memory transport, the test
//!   plays the server side through the peer handle
//! - `MockWsServer`: real WebSocket server on localhost

#![allow(dead_code)]

use async_trait::async_trait;
use iotransit::core::*;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

// =============================================================================
// Scripted transport
// =============================================================================

/// What the next connect attempt does
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    Accept,
    Refuse(String),
    /// Never completes
    Hang,
    /// Accepts once the gate is opened
    Gated(Arc<Notify>),
}

struct MockState {
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    requests: Mutex<Vec<ConnectRequest>>,
    attempts: AtomicUsize,
    peers: UnboundedSender<MockPeer>,
}

/// Connector whose attempts follow a script; refuses once the script runs out
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    /// Connector plus the stream of peers for accepted connections
    pub fn new() -> (Self, UnboundedReceiver<MockPeer>) {
        let (peers, peer_rx) = unbounded_channel();
        let connector = Self {
            state: Arc::new(MockState {
                outcomes: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                attempts: AtomicUsize::new(0),
                peers,
            }),
        };
        (connector, peer_rx)
    }

    pub fn push(&self, outcome: ConnectOutcome) -> &Self {
        self.state.outcomes.lock().push_back(outcome);
        self
    }

    pub fn accept(&self) -> &Self {
        self.push(ConnectOutcome::Accept)
    }

    pub fn refuse(&self, reason: &str) -> &Self {
        self.push(ConnectOutcome::Refuse(reason.to_string()))
    }

    /// Accept the next attempt only after `notify_one` on the returned gate
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(ConnectOutcome::Gated(Arc::clone(&gate)));
        gate
    }

    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ConnectRequest> {
        self.state.requests.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, request: &ConnectRequest) -> iotransit::Result<MockTransport> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        self.state.requests.lock().push(request.clone());

        let outcome = self
            .state
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| ConnectOutcome::Refuse("connection refused".to_string()));

        if let ConnectOutcome::Gated(gate) = &outcome {
            gate.notified().await;
        }

        match outcome {
            ConnectOutcome::Accept | ConnectOutcome::Gated(_) => {
                let (transport, peer) = mock_pair(request.clone());
                let _ = self.state.peers.send(peer);
                Ok(transport)
            }
            ConnectOutcome::Refuse(reason) => Err(IoTransitError::ConnectFailed(reason)),
            ConnectOutcome::Hang => std::future::pending().await,
        }
    }
}

pub struct MockTransport {
    outbound: UnboundedSender<Frame>,
    inbound: UnboundedReceiver<TransportEvent>,
    closed_by_client: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: Frame) -> iotransit::Result<()> {
        self.outbound
            .send(frame)
            .map_err(|_| IoTransitError::Transport("peer gone".to_string()))
    }

    async fn next_event(&mut self) -> TransportEvent {
        self.inbound
            .recv()
            .await
            .unwrap_or(TransportEvent::Closed(None))
    }

    async fn close(&mut self) -> iotransit::Result<()> {
        self.closed_by_client.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Server side of a mock connection
pub struct MockPeer {
    pub request: ConnectRequest,
    outbound: UnboundedReceiver<Frame>,
    inbound: UnboundedSender<TransportEvent>,
    closed_by_client: Arc<AtomicBool>,
}

fn mock_pair(request: ConnectRequest) -> (MockTransport, MockPeer) {
    let (out_tx, out_rx) = unbounded_channel();
    let (in_tx, in_rx) = unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    (
        MockTransport {
            outbound: out_tx,
            inbound: in_rx,
            closed_by_client: Arc::clone(&closed),
        },
        MockPeer {
            request,
            outbound: out_rx,
            inbound: in_tx,
            closed_by_client: closed,
        },
    )
}

impl MockPeer {
    /// Frames the client has written so far, without waiting
    pub fn written(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Wait for the next frame the client writes
    pub async fn next_written(&mut self) -> Frame {
        tokio::time::timeout(Duration::from_secs(2), self.outbound.recv())
            .await
            .expect("timed out waiting for outbound frame")
            .expect("transport dropped")
    }

    pub fn push_text(&self, text: &str) {
        let _ = self
            .inbound
            .send(TransportEvent::Message(Frame::Text(text.to_string())));
    }

    pub fn push_binary(&self, len: usize) {
        let _ = self
            .inbound
            .send(TransportEvent::Message(Frame::Binary(vec![0xAB; len])));
    }

    pub fn push_error(&self, error: &str) {
        let _ = self.inbound.send(TransportEvent::Error(error.to_string()));
    }

    /// Remote close
    pub fn close(&self) {
        let _ = self.inbound.send(TransportEvent::Closed(None));
    }

    pub fn closed_by_client(&self) -> bool {
        self.closed_by_client.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Let spawned channel tasks run until they block
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub async fn next_peer(peers: &mut UnboundedReceiver<MockPeer>) -> MockPeer {
    tokio::time::timeout(Duration::from_secs(2), peers.recv())
        .await
        .expect("timed out waiting for connection")
        .expect("connector dropped")
}

pub async fn next_notification<C: Connector>(client: &mut IoTransitClient<C>) -> Notification {
    tokio::time::timeout(Duration::from_secs(2), client.recv_notification())
        .await
        .expect("timed out waiting for notification")
        .expect("notification queue closed")
}

/// Everything queued right now
pub fn drain<C: Connector>(client: &mut IoTransitClient<C>) -> Vec<Notification> {
    let mut notifications = Vec::new();
    while let Some(notification) = client.try_recv_notification() {
        notifications.push(notification);
    }
    notifications
}

pub fn kinds(notifications: &[Notification]) -> Vec<NotificationKind> {
    notifications.iter().map(Notification::kind).collect()
}

// =============================================================================
// Real WebSocket server
// =============================================================================

/// Handshake headers seen by the mock server
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub protocol: Option<String>,
    pub origin: Option<String>,
}

/// A simple echo WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    drop_connections: Arc<Notify>,
    received: Arc<Mutex<Vec<String>>>,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let drop_connections = Arc::new(Notify::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let handshakes = Arc::new(Mutex::new(Vec::new()));

        let server = Self {
            addr,
            shutdown: Arc::clone(&shutdown),
            drop_connections: Arc::clone(&drop_connections),
            received: Arc::clone(&received),
            handshakes: Arc::clone(&handshakes),
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let drop_connections = Arc::clone(&drop_connections);
                                let received = Arc::clone(&received);
                                let handshakes = Arc::clone(&handshakes);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, drop_connections, received, handshakes).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown.notified() => {
                        break;
                    }
                }
            }
        });

        server
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        drop_connections: Arc<Notify>,
        received: Arc<Mutex<Vec<String>>>,
        handshakes: Arc<Mutex<Vec<Handshake>>>,
    ) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_hdr_async;
        use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
        use tokio_tungstenite::tungstenite::Message;

        let callback = move |request: &Request, mut response: Response| -> std::result::Result<Response, ErrorResponse> {
            let header = |name: &str| {
                request
                    .headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
            };
            let handshake = Handshake {
                protocol: header("Sec-WebSocket-Protocol"),
                origin: header("Origin"),
            };
            if let Some(protocol) = request.headers().get("Sec-WebSocket-Protocol") {
                response
                    .headers_mut()
                    .insert("Sec-WebSocket-Protocol", protocol.clone());
            }
            handshakes.lock().push(handshake);
            Ok(response)
        };

        let ws_stream = match accept_hdr_async(stream, callback).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if let Message::Text(text) = &msg {
                                received.lock().push(text.clone());
                            }
                            if msg.is_text() || msg.is_binary() {
                                // Echo the message back
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            } else if msg.is_close() {
                                break;
                            }
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = drop_connections.notified() => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Text frames received from all clients, in arrival order
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    pub fn handshakes(&self) -> Vec<Handshake> {
        self.handshakes.lock().clone()
    }

    /// Close every open connection from the server side
    pub fn drop_connections(&self) {
        self.drop_connections.notify_waiters();
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll a condition until it holds or two seconds pass
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
