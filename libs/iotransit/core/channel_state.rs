//! Lock-free channel state and counters
//!
//! Written only by the channel task, read from any thread through the
//! client.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelState {
    /// Not asked to connect, or explicitly disconnected
    Idle = 0,
    /// Transport handshake in flight
    Connecting = 1,
    /// Transport open, sends go through
    Connected = 2,
    /// Transport gone; a retry may be pending
    Closed = 3,
}

impl ChannelState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ChannelState::Connecting,
            2 => ChannelState::Connected,
            3 => ChannelState::Closed,
            _ => ChannelState::Idle,
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelState::Idle => "idle",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
            ChannelState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct AtomicChannelState {
    inner: AtomicU8,
}

impl AtomicChannelState {
    pub fn new(state: ChannelState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ChannelState {
        ChannelState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ChannelState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.get() == ChannelState::Idle
    }

    #[inline]
    pub fn is_connecting(&self) -> bool {
        self.get() == ChannelState::Connecting
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ChannelState::Connected
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.get() == ChannelState::Closed
    }
}

impl Default for AtomicChannelState {
    fn default() -> Self {
        Self::new(ChannelState::Idle)
    }
}

/// Channel metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMetrics {
    pub frames_sent: u64,
    pub messages_received: u64,
    pub binary_frames_dropped: u64,
    pub binary_bytes_dropped: u64,
    pub connect_attempts: u64,
    pub reconnect_count: u64,
}

#[derive(Debug, Default)]
pub struct AtomicChannelMetrics {
    frames_sent: AtomicU64,
    messages_received: AtomicU64,
    binary_frames_dropped: AtomicU64,
    binary_bytes_dropped: AtomicU64,
    connect_attempts: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicChannelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_binary_dropped(&self, bytes: usize) {
        self.binary_frames_dropped.fetch_add(1, Ordering::Relaxed);
        self.binary_bytes_dropped
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_connect_attempts(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ChannelMetrics {
        ChannelMetrics {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            binary_frames_dropped: self.binary_frames_dropped.load(Ordering::Relaxed),
            binary_bytes_dropped: self.binary_bytes_dropped.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            reconnect_count: self.reconnect_count.load(Ordering::Relaxed),
        }
    }
}
