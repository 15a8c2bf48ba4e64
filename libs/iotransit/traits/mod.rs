//! # IoTransit Traits
//!
//! Seams between the channel state machine and the outside world:
//!
//! - **Connector / Transport**: Open and drive a socket connection
//! - **AuthProvider**: Build the message sent right after a connection opens
//! - **ReconnectionStrategy**: Decide when (and whether) to reconnect

pub mod auth;
pub mod error;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use auth::{AppletAuth, AuthProvider, NoAuth, AUTH_MESSAGE_TYPE};
pub use error::{IoTransitError, Result};
pub use reconnect::{strategy_for, FixedDelay, NeverReconnect, ReconnectionStrategy};
pub use transport::{ConnectRequest, Connector, Frame, Transport, TransportEvent};
