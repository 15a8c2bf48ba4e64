//! Notifications emitted by channels and the client
//!
//! Both channels feed one unbounded queue. Producers never block; the
//! consumer takes one notification at a time, so handling of one event
//! always finishes before the next is delivered.

use crate::traits::IoTransitError;
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Which backend a channel talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    /// Core engine
    Core,
    /// Event engine
    Event,
}

impl ChannelId {
    pub const ALL: [ChannelId; 2] = [ChannelId::Core, ChannelId::Event];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelId::Core => "core",
            ChannelId::Event => "event",
        }
    }

    /// Wrap an inbound payload in this channel's message notification
    pub fn message(self, payload: Value) -> Notification {
        match self {
            ChannelId::Core => Notification::CoreMessage(payload),
            ChannelId::Event => Notification::EventMessage(payload),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminant of [`Notification`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Connection,
    ConnectionFailed,
    ConnectionClose,
    ConnectionError,
    SendError,
    CoreMessage,
    EventMessage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Transport opened and auth request sent
    Connection { channel: ChannelId, description: String },
    /// Transport handshake failed
    ConnectionFailed { channel: ChannelId, reason: String },
    /// Open connection closed, remotely or locally
    ConnectionClose { channel: ChannelId, reason: String },
    /// Error on an open connection; state unchanged
    ConnectionError { channel: ChannelId, error: String },
    /// Payload discarded because the channel is not connected
    SendError { channel: ChannelId, reason: String },
    /// Inbound payload from the core engine
    CoreMessage(Value),
    /// Inbound payload from the event engine
    EventMessage(Value),
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Connection { .. } => NotificationKind::Connection,
            Notification::ConnectionFailed { .. } => NotificationKind::ConnectionFailed,
            Notification::ConnectionClose { .. } => NotificationKind::ConnectionClose,
            Notification::ConnectionError { .. } => NotificationKind::ConnectionError,
            Notification::SendError { .. } => NotificationKind::SendError,
            Notification::CoreMessage(_) => NotificationKind::CoreMessage,
            Notification::EventMessage(_) => NotificationKind::EventMessage,
        }
    }

    pub fn channel(&self) -> ChannelId {
        match self {
            Notification::Connection { channel, .. }
            | Notification::ConnectionFailed { channel, .. }
            | Notification::ConnectionClose { channel, .. }
            | Notification::ConnectionError { channel, .. }
            | Notification::SendError { channel, .. } => *channel,
            Notification::CoreMessage(_) => ChannelId::Core,
            Notification::EventMessage(_) => ChannelId::Event,
        }
    }

    /// Payload of a message notification
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Notification::CoreMessage(value) | Notification::EventMessage(value) => Some(value),
            _ => None,
        }
    }
}

/// Producer side of the notification queue
#[derive(Debug, Clone)]
pub struct NotificationSink {
    tx: UnboundedSender<Notification>,
}

impl NotificationSink {
    pub fn channel() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver a notification; silently dropped once the consumer is gone
    pub fn emit(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }

    pub fn send_error(&self, channel: ChannelId) {
        self.emit(Notification::SendError {
            channel,
            reason: IoTransitError::NotConnected(channel.to_string()).to_string(),
        });
    }
}
