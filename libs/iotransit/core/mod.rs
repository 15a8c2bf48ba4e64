//! # IoTransit core
//!
//! Channel state machine, client composition and configuration.
//!
//! ## Example
//!
//! ```rust,ignore
//! use iotransit::core::*;
//!
//! #[tokio::main]
//! async fn main() -> iotransit::Result<()> {
//!     let mut client = IoTransitClient::new(AppletOptions {
//!         accepts: Some(AcceptTags::Many(vec!["A1".into(), "grp1".into()])),
//!         connect_ee: Some(false),
//!         ..AppletOptions::new("A1")
//!     })?;
//!
//!     client.connect()?;
//!     client.send_core(&serde_json::json!({"t": "ping"}));
//!
//!     while let Some(notification) = client.recv_notification().await {
//!         println!("{:?}", notification);
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod channel_state;
pub mod client;
pub mod config;
pub mod notification;
pub mod tungstenite;

// Re-export main types
pub use channel::{Channel, ChannelSettings};
pub use channel_state::{AtomicChannelMetrics, AtomicChannelState, ChannelMetrics, ChannelState};
pub use client::IoTransitClient;
pub use config::{
    AcceptTags, AppletOptions, AuthCredentials, ChannelConfig, ChannelEndpoint, ClientConfig,
    ClientOptions, ConfigDefaults, EndpointDefaults, DEFAULTS,
};
pub use notification::{ChannelId, Notification, NotificationKind, NotificationSink};
pub use tungstenite::{TungsteniteConnector, TungsteniteTransport};

// Re-export traits for convenience
pub use crate::traits::*;
