//! # IoTransit
//!
//! Resilient dual-channel client for the IoTransit core and event engines.
//!
//! ## Features
//!
//! - **Independent channels**: Core and event connections fail and recover separately
//! - **Explicit state machine**: Idle, Connecting, Connected, Closed per channel
//! - **Fixed-delay reconnection**: One pending retry per channel, no backoff, no cap
//! - **Single notification queue**: Both channels report into one ordered stream
//! - **Pluggable transport**: tokio-tungstenite by default, any `Connector` in tests

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use crate::core::{
    channel, channel_state, client, config, notification,
    channel::{Channel, ChannelSettings},
    channel_state::{ChannelMetrics, ChannelState},
    client::IoTransitClient,
    config::{AcceptTags, AppletOptions, ClientConfig, ClientOptions, DEFAULTS},
    notification::{ChannelId, Notification, NotificationKind, NotificationSink},
    tungstenite::{TungsteniteConnector, TungsteniteTransport},
};
