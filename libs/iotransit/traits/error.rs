use thiserror::Error;

/// Main error type for iotransit
#[derive(Error, Debug)]
pub enum IoTransitError {
    /// Configuration rejected at construction time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport refused or failed the connection handshake
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Socket error on an open connection
    #[error("Transport error: {0}")]
    Transport(String),

    /// Payload could not be serialized or parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Send attempted on a channel without a live transport
    #[error("{0} engine not connected")]
    NotConnected(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidState(String),

    /// Channel command queue is gone
    #[error("Channel send error: {0}")]
    ChannelSend(String),
}

/// Result type for iotransit operations
pub type Result<T> = std::result::Result<T, IoTransitError>;
