use crate::core::channel::{Channel, ChannelSettings};
use crate::core::channel_state::{ChannelMetrics, ChannelState};
use crate::core::config::{ClientConfig, ClientOptions};
use crate::core::notification::{ChannelId, Notification, NotificationSink};
use crate::core::tungstenite::TungsteniteConnector;
use crate::traits::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

/// Dual-channel applet client
///
/// Owns a core-engine channel and an event-engine channel, each present
/// only if enabled in the configuration. Both channels report into one
/// notification queue, drained with [`recv_notification`] or
/// [`try_recv_notification`].
///
/// # Example
/// ```ignore
/// let mut client = IoTransitClient::new("A1")?;
/// client.connect()?;
///
/// while let Some(notification) = client.recv_notification().await {
///     if let Notification::EventMessage(payload) = notification {
///         client.send_event(&payload);
///     }
/// }
/// ```
///
/// [`recv_notification`]: IoTransitClient::recv_notification
/// [`try_recv_notification`]: IoTransitClient::try_recv_notification
pub struct IoTransitClient<C: Connector = TungsteniteConnector> {
    config: Arc<ClientConfig>,
    core: Option<Channel<C>>,
    event: Option<Channel<C>>,
    sink: NotificationSink,
    notifications: UnboundedReceiver<Notification>,
    /// Reserved: no server acknowledgement of the auth request exists
    authenticated: AtomicBool,
}

impl IoTransitClient<TungsteniteConnector> {
    /// Create a client that connects over real WebSockets
    pub fn new(options: impl Into<ClientOptions>) -> Result<Self> {
        Self::with_connector(options, TungsteniteConnector::new())
    }
}

impl<C: Connector> IoTransitClient<C> {
    /// Create a client with a custom transport
    ///
    /// Fails with [`IoTransitError::Configuration`] if the options carry
    /// no applet id. No task is spawned until [`connect`](Self::connect).
    pub fn with_connector(options: impl Into<ClientOptions>, connector: C) -> Result<Self> {
        let config = Arc::new(ClientConfig::resolve(options)?);
        let connector = Arc::new(connector);
        let auth: Arc<dyn AuthProvider> = Arc::new(config.applet_auth());
        let (sink, notifications) = NotificationSink::channel();

        let build = |id: ChannelId| {
            let channel_config = config.channel(id);
            if !channel_config.enabled {
                debug!(channel = %id, "Channel disabled in configuration");
                return None;
            }
            let settings = ChannelSettings {
                request: channel_config.endpoint.connect_request(),
                auth: Arc::clone(&auth),
                reconnect_strategy: strategy_for(
                    config.auto_reconnect(),
                    config.reconnection_delay(),
                ),
            };
            Some(Channel::new(
                id,
                settings,
                Arc::clone(&connector),
                sink.clone(),
            ))
        };

        let core = build(ChannelId::Core);
        let event = build(ChannelId::Event);

        Ok(Self {
            config,
            core,
            event,
            sink,
            notifications,
            authenticated: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start every enabled channel
    pub fn connect(&self) -> Result<()> {
        info!(applet = %self.config.applet_id(), "Connecting applet channels");
        for channel in self.channels() {
            channel.connect()?;
        }
        Ok(())
    }

    /// Drop every open connection; no reconnect follows
    pub fn disconnect(&self) {
        info!(applet = %self.config.applet_id(), "Disconnecting applet channels");
        for channel in self.channels() {
            channel.disconnect();
        }
    }

    /// Send a payload to the core engine
    pub fn send_core<T: Serialize + ?Sized>(&self, payload: &T) {
        self.send(ChannelId::Core, payload);
    }

    /// Send a payload to the event engine
    pub fn send_event<T: Serialize + ?Sized>(&self, payload: &T) {
        self.send(ChannelId::Event, payload);
    }

    /// Serialize and send a payload on the given channel
    ///
    /// Never fails: a disabled or disconnected channel, or a payload that
    /// does not serialize, yields a `SendError` notification instead.
    pub fn send<T: Serialize + ?Sized>(&self, id: ChannelId, payload: &T) {
        let Some(channel) = self.channel(id) else {
            self.sink.send_error(id);
            return;
        };

        match serde_json::to_string(payload) {
            Ok(text) => channel.send(text),
            Err(e) => {
                warn!(channel = %id, error = %e, "Payload serialization failed");
                self.sink.emit(Notification::SendError {
                    channel: id,
                    reason: format!("payload serialization failed: {}", e),
                });
            }
        }
    }

    /// Wait for the next notification
    pub async fn recv_notification(&mut self) -> Option<Notification> {
        self.notifications.recv().await
    }

    /// Try to receive a notification (non-blocking)
    pub fn try_recv_notification(&mut self) -> Option<Notification> {
        match self.notifications.try_recv() {
            Ok(notification) => Some(notification),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// State of a channel; disabled channels report `Idle`
    pub fn channel_state(&self, id: ChannelId) -> ChannelState {
        self.channel(id)
            .map(Channel::state)
            .unwrap_or(ChannelState::Idle)
    }

    #[inline]
    pub fn is_connected(&self, id: ChannelId) -> bool {
        self.channel(id).map_or(false, Channel::is_connected)
    }

    pub fn is_enabled(&self, id: ChannelId) -> bool {
        self.channel(id).is_some()
    }

    pub fn metrics(&self, id: ChannelId) -> Option<ChannelMetrics> {
        self.channel(id).map(Channel::metrics)
    }

    /// Always `false`; kept for a future auth acknowledgement protocol
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Stop both channels, closing any open connection
    pub async fn shutdown(self) {
        info!(applet = %self.config.applet_id(), "Shutting down applet client");
        for channel in self.channels() {
            channel.shutdown().await;
        }
    }

    fn channel(&self, id: ChannelId) -> Option<&Channel<C>> {
        match id {
            ChannelId::Core => self.core.as_ref(),
            ChannelId::Event => self.event.as_ref(),
        }
    }

    fn channels(&self) -> impl Iterator<Item = &Channel<C>> {
        self.core.iter().chain(self.event.iter())
    }
}
