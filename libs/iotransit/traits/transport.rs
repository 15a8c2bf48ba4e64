use crate::error::Result;
use async_trait::async_trait;

/// A single WebSocket data frame
/// Can be Text or Binary data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Get the frame as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Frame::Text(s) => Some(s),
            Frame::Binary(_) => None,
        }
    }

    /// Get the frame as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Frame::Text(_) => None,
            Frame::Binary(b) => Some(b),
        }
    }

    /// Check if frame is text
    pub fn is_text(&self) -> bool {
        matches!(self, Frame::Text(_))
    }

    /// Check if frame is binary
    pub fn is_binary(&self) -> bool {
        matches!(self, Frame::Binary(_))
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(s) => s.len(),
            Frame::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Something that happened on an open transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Inbound data frame
    Message(Frame),
    /// Socket error; the connection may still be open
    Error(String),
    /// Connection is gone, with an optional reason
    Closed(Option<String>),
}

/// Destination of a transport connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Full URL, e.g. `ws://127.0.0.1:1004/`
    pub url: String,
    /// Value of the `Sec-WebSocket-Protocol` header
    pub sub_protocol: String,
    /// Value of the `Origin` header
    pub origin: String,
}

/// Factory for transport connections
///
/// A channel keeps its connector for its whole life and calls `connect`
/// once per attempt, including every reconnection.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connection type produced on success
    type Transport: Transport;

    /// Perform the transport handshake
    ///
    /// # Returns
    /// * `Ok(transport)` - Connection is open
    /// * `Err(IoTransitError::ConnectFailed)` - Handshake rejected or unreachable
    async fn connect(&self, request: &ConnectRequest) -> Result<Self::Transport>;
}

/// An open, exclusively owned connection
#[async_trait]
pub trait Transport: Send + 'static {
    /// Write one frame
    async fn send(&mut self, frame: Frame) -> Result<()>;

    /// Wait for the next inbound event
    ///
    /// Must be cancel-safe: the channel races this future against its
    /// command queue and drops it whenever a command arrives first.
    /// Once `Closed` has been returned the transport is not polled again.
    async fn next_event(&mut self) -> TransportEvent;

    /// Drop the connection
    async fn close(&mut self) -> Result<()>;
}
