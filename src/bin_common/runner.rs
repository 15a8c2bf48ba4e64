//! Binary runner utilities
//!
//! Drives an applet client with startup and shutdown banners, a periodic
//! status heartbeat and graceful Ctrl+C handling.

use iotransit::core::{ChannelId, Connector, IoTransitClient, Notification, TungsteniteConnector};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// Heartbeat interval in seconds
    pub heartbeat_interval_secs: u64,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            heartbeat_interval_secs: 300, // 5 minutes default
        }
    }

    pub fn with_heartbeat(mut self, secs: u64) -> Self {
        self.heartbeat_interval_secs = secs;
        self
    }
}

/// Counts of what the runner saw, logged at shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub messages: u64,
    pub connection_events: u64,
    pub errors: u64,
}

impl RunStats {
    fn record(&mut self, notification: &Notification) {
        match notification {
            Notification::CoreMessage(_) | Notification::EventMessage(_) => self.messages += 1,
            Notification::Connection { .. } | Notification::ConnectionClose { .. } => {
                self.connection_events += 1
            }
            Notification::ConnectionFailed { .. }
            | Notification::ConnectionError { .. }
            | Notification::SendError { .. } => self.errors += 1,
        }
    }
}

/// Connects an applet and logs its notifications until shutdown
pub struct AppletRunner<C: Connector = TungsteniteConnector> {
    client: IoTransitClient<C>,
    config: RunConfig,
}

impl<C: Connector> AppletRunner<C> {
    pub fn new(client: IoTransitClient<C>, config: RunConfig) -> Self {
        Self { client, config }
    }

    /// Run until Ctrl+C
    pub async fn run(self) -> anyhow::Result<RunStats> {
        self.run_until(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("");
                info!("Received shutdown signal (Ctrl+C)");
                info!("Shutting down gracefully...");
            }
        })
        .await
    }

    /// Run until `shutdown` completes or the notification queue closes
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> anyhow::Result<RunStats> {
        self.print_banner();
        self.client.connect()?;

        let mut stats = RunStats::default();
        let mut heartbeat =
            tokio::time::interval(Duration::from_secs(self.config.heartbeat_interval_secs.max(1)));
        heartbeat.tick().await;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                notification = self.client.recv_notification() => match notification {
                    Some(notification) => {
                        stats.record(&notification);
                        log_notification(&notification);
                    }
                    None => break,
                },
                _ = heartbeat.tick() => self.log_status(),
            }
        }

        let name = self.config.name.clone();
        self.client.shutdown().await;
        print_shutdown(&name, &stats);
        Ok(stats)
    }

    fn log_status(&self) {
        for id in ChannelId::ALL {
            if let Some(metrics) = self.client.metrics(id) {
                info!(
                    channel = %id,
                    state = %self.client.channel_state(id),
                    sent = metrics.frames_sent,
                    received = metrics.messages_received,
                    reconnects = metrics.reconnect_count,
                    "Heartbeat"
                );
            }
        }
    }

    fn print_banner(&self) {
        info!("");
        info!("========================================");
        info!("Starting {}", self.config.name);
        info!("Applet: {}", self.client.config().applet_id());
        info!("Press Ctrl+C to stop");
        info!("========================================");
        info!("");
    }
}

fn log_notification(notification: &Notification) {
    match notification {
        Notification::Connection { description, .. } => info!("{}", description),
        Notification::ConnectionClose { reason, .. } => warn!("{}", reason),
        Notification::ConnectionFailed { channel, reason } => {
            warn!(channel = %channel, "Connection failed: {}", reason)
        }
        Notification::ConnectionError { channel, error } => {
            warn!(channel = %channel, "Connection error: {}", error)
        }
        Notification::SendError { reason, .. } => warn!("Send error: {}", reason),
        Notification::CoreMessage(payload) => info!(channel = "core", "Message: {}", payload),
        Notification::EventMessage(payload) => info!(channel = "event", "Message: {}", payload),
    }
}

fn print_shutdown(name: &str, stats: &RunStats) {
    info!("");
    info!("========================================");
    info!("{} stopped gracefully", name);
    info!(
        "Messages: {} | Connection events: {} | Errors: {}",
        stats.messages, stats.connection_events, stats.errors
    );
    info!("========================================");
}
