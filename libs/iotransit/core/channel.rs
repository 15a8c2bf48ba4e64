//! Per-channel connection state machine
//!
//! # Architecture
//!
//! ```text
//! Channel (handle) ── commands ──> ChannelActor (tokio task)
//!                                     │
//!   Idle ── Connect ──> Connecting ───┼── ok ──> Connected ── close ──> Closed
//!                           ▲         └─ err ──────────────────────────> Closed
//!                           └────────── retry timer fires ───────────────┘
//! ```
//!
//! The actor owns the transport and the reconnect timer. The timer is part
//! of the `Closed` phase, so a channel can never have two of them pending.
//! Commands and transport events are handled one at a time, in arrival
//! order.

use crate::core::channel_state::{
    AtomicChannelMetrics, AtomicChannelState, ChannelMetrics, ChannelState,
};
use crate::core::notification::{ChannelId, Notification, NotificationSink};
use crate::traits::*;
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tracing::{debug, error, info, warn};

type ConnectFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Internal command messages for channel control
#[derive(Debug)]
enum ChannelCommand {
    Connect,
    Disconnect,
    /// Serialized payload
    Send(String),
    Shutdown,
}

/// Where the actor currently is, with whatever that phase owns
enum Phase<T> {
    Idle,
    Connecting(ConnectFuture<T>),
    Connected(T),
    Closed(Option<Pin<Box<Sleep>>>),
}

/// Everything a channel needs besides its transport factory
pub struct ChannelSettings {
    pub request: ConnectRequest,
    pub auth: Arc<dyn AuthProvider>,
    pub reconnect_strategy: Box<dyn ReconnectionStrategy>,
}

enum Runner<C: Connector> {
    /// Built but not yet spawned; no connect requested so far
    Pending(Box<ChannelActor<C>>),
    Running(JoinHandle<()>),
    Finished,
}

/// Handle to one independently managed connection
///
/// All operations are non-blocking. Failures are reported as
/// [`Notification`]s, never returned, except for misuse of the handle
/// itself (no runtime, already shut down).
pub struct Channel<C: Connector> {
    id: ChannelId,
    state: Arc<AtomicChannelState>,
    metrics: Arc<AtomicChannelMetrics>,
    sink: NotificationSink,
    command_tx: UnboundedSender<ChannelCommand>,
    runner: Mutex<Runner<C>>,
}

impl<C: Connector> Channel<C> {
    /// Create an idle channel; no task is spawned until the first connect
    pub fn new(
        id: ChannelId,
        settings: ChannelSettings,
        connector: Arc<C>,
        sink: NotificationSink,
    ) -> Self {
        let state = Arc::new(AtomicChannelState::new(ChannelState::Idle));
        let metrics = Arc::new(AtomicChannelMetrics::new());
        let (command_tx, command_rx) = unbounded_channel();

        let actor = ChannelActor {
            id,
            request: settings.request,
            connector,
            auth: settings.auth,
            strategy: settings.reconnect_strategy,
            attempt: 0,
            state: Arc::clone(&state),
            metrics: Arc::clone(&metrics),
            sink: sink.clone(),
            commands: command_rx,
        };

        Self {
            id,
            state,
            metrics,
            sink,
            command_tx,
            runner: Mutex::new(Runner::Pending(Box::new(actor))),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn metrics(&self) -> ChannelMetrics {
        self.metrics.snapshot()
    }

    /// Start connecting
    ///
    /// Valid from `Idle` or `Closed`; ignored while connecting or
    /// connected. Must be called from within a tokio runtime.
    pub fn connect(&self) -> Result<()> {
        {
            let mut runner = self.runner.lock();
            if matches!(*runner, Runner::Pending(_)) {
                let handle = tokio::runtime::Handle::try_current().map_err(|_| {
                    IoTransitError::InvalidState(format!(
                        "{} channel: connect requires a tokio runtime",
                        self.id
                    ))
                })?;
                if let Runner::Pending(actor) = std::mem::replace(&mut *runner, Runner::Finished) {
                    *runner = Runner::Running(handle.spawn(actor.run()));
                }
            }
            if matches!(*runner, Runner::Finished) {
                return Err(IoTransitError::InvalidState(format!(
                    "{} channel is shut down",
                    self.id
                )));
            }
        }
        self.command(ChannelCommand::Connect)
    }

    /// Drop the connection without scheduling a reconnect
    ///
    /// Acts on `Connected` and `Closed` only; ignored while idle or
    /// connecting.
    pub fn disconnect(&self) {
        let state = self.state();
        if !self.is_running() || matches!(state, ChannelState::Idle | ChannelState::Connecting) {
            debug!(channel = %self.id, state = %state, "Disconnect ignored");
            return;
        }
        let _ = self.command(ChannelCommand::Disconnect);
    }

    /// Queue a serialized payload
    ///
    /// The channel must be connected at the time of the call; otherwise a
    /// `SendError` notification is emitted and the payload is discarded.
    /// A payload racing a close is rejected the same way by the task.
    pub fn send(&self, payload: String) {
        if !self.is_running() || !self.is_connected() {
            self.sink.send_error(self.id);
            return;
        }
        if self.command(ChannelCommand::Send(payload)).is_err() {
            self.sink.send_error(self.id);
        }
    }

    /// Close any live transport and stop the channel task
    pub async fn shutdown(&self) {
        let handle = {
            let mut runner = self.runner.lock();
            match std::mem::replace(&mut *runner, Runner::Finished) {
                Runner::Running(handle) => Some(handle),
                Runner::Pending(_) | Runner::Finished => None,
            }
        };

        if let Some(handle) = handle {
            let _ = self.command_tx.send(ChannelCommand::Shutdown);
            let _ = handle.await;
        }
        self.state.set(ChannelState::Idle);
    }

    fn is_running(&self) -> bool {
        matches!(*self.runner.lock(), Runner::Running(_))
    }

    fn command(&self, command: ChannelCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| IoTransitError::ChannelSend(e.to_string()))
    }
}

struct ChannelActor<C: Connector> {
    id: ChannelId,
    request: ConnectRequest,
    connector: Arc<C>,
    auth: Arc<dyn AuthProvider>,
    strategy: Box<dyn ReconnectionStrategy>,
    /// Consecutive failed attempts since the last successful connect
    attempt: usize,
    state: Arc<AtomicChannelState>,
    metrics: Arc<AtomicChannelMetrics>,
    sink: NotificationSink,
    commands: UnboundedReceiver<ChannelCommand>,
}

impl<C: Connector> ChannelActor<C> {
    async fn run(mut self: Box<Self>) {
        debug!(channel = %self.id, url = %self.request.url, "Channel task started");

        let mut phase = Phase::Idle;
        loop {
            let next = match phase {
                Phase::Idle => self.idle().await,
                Phase::Connecting(connecting) => self.connecting(connecting).await,
                Phase::Connected(transport) => self.connected(transport).await,
                Phase::Closed(retry) => self.closed(retry).await,
            };
            match next {
                Some(next) => phase = next,
                None => break,
            }
        }

        self.state.set(ChannelState::Idle);
        debug!(channel = %self.id, "Channel task exiting");
    }

    async fn idle(&mut self) -> Option<Phase<C::Transport>> {
        loop {
            match self.commands.recv().await? {
                ChannelCommand::Connect => return Some(self.begin_connect()),
                ChannelCommand::Send(_) => self.sink.send_error(self.id),
                ChannelCommand::Disconnect => {
                    debug!(channel = %self.id, "Disconnect ignored, channel idle");
                }
                ChannelCommand::Shutdown => return None,
            }
        }
    }

    async fn connecting(
        &mut self,
        mut connecting: ConnectFuture<C::Transport>,
    ) -> Option<Phase<C::Transport>> {
        loop {
            // Commands queued before the connect resolves belong to this phase
            tokio::select! {
                biased;
                cmd = self.commands.recv() => match cmd? {
                    ChannelCommand::Send(_) => self.sink.send_error(self.id),
                    ChannelCommand::Connect => {
                        debug!(channel = %self.id, "Connect ignored, already connecting");
                    }
                    ChannelCommand::Disconnect => {
                        debug!(channel = %self.id, "Disconnect ignored, connect in flight");
                    }
                    ChannelCommand::Shutdown => return None,
                },
                result = &mut connecting => {
                    return Some(match result {
                        Ok(transport) => self.on_open(transport).await,
                        Err(e) => self.on_connect_failed(e),
                    });
                }
            }
        }
    }

    async fn connected(&mut self, mut transport: C::Transport) -> Option<Phase<C::Transport>> {
        loop {
            tokio::select! {
                event = transport.next_event() => match event {
                    TransportEvent::Message(Frame::Text(text)) => self.on_text(&text),
                    TransportEvent::Message(Frame::Binary(data)) => {
                        info!(
                            channel = %self.id,
                            bytes = data.len(),
                            "{} engine client received a binary of {} bytes",
                            self.id,
                            data.len()
                        );
                        self.metrics.record_binary_dropped(data.len());
                    }
                    TransportEvent::Error(error) => {
                        warn!(channel = %self.id, error = %error, "Connection error");
                        self.sink.emit(Notification::ConnectionError {
                            channel: self.id,
                            error,
                        });
                    }
                    TransportEvent::Closed(reason) => return Some(self.on_closed(reason)),
                },
                cmd = self.commands.recv() => match cmd {
                    Some(ChannelCommand::Send(payload)) => self.write(&mut transport, payload).await,
                    Some(ChannelCommand::Connect) => {
                        debug!(channel = %self.id, "Connect ignored, already connected");
                    }
                    Some(ChannelCommand::Disconnect) => {
                        return Some(self.on_disconnect(transport).await);
                    }
                    Some(ChannelCommand::Shutdown) | None => {
                        if let Err(e) = transport.close().await {
                            debug!(channel = %self.id, error = %e, "Close during shutdown failed");
                        }
                        return None;
                    }
                },
            }
        }
    }

    async fn closed(
        &mut self,
        mut retry: Option<Pin<Box<Sleep>>>,
    ) -> Option<Phase<C::Transport>> {
        loop {
            tokio::select! {
                biased;
                cmd = self.commands.recv() => match cmd? {
                    ChannelCommand::Connect => {
                        if retry.is_some() {
                            debug!(channel = %self.id, "Connect requested, pending retry discarded");
                        }
                        return Some(self.begin_connect());
                    }
                    ChannelCommand::Disconnect => {
                        if retry.take().is_some() {
                            info!(channel = %self.id, "Pending reconnect cancelled");
                        }
                        self.state.set(ChannelState::Idle);
                        return Some(Phase::Idle);
                    }
                    ChannelCommand::Send(_) => self.sink.send_error(self.id),
                    ChannelCommand::Shutdown => return None,
                },
                _ = wait_retry(&mut retry) => {
                    self.metrics.increment_reconnects();
                    return Some(self.begin_connect());
                }
            }
        }
    }

    fn begin_connect(&mut self) -> Phase<C::Transport> {
        self.state.set(ChannelState::Connecting);
        self.metrics.increment_connect_attempts();
        info!(channel = %self.id, url = %self.request.url, "Connecting");

        let connector = Arc::clone(&self.connector);
        let request = self.request.clone();
        Phase::Connecting(Box::pin(async move { connector.connect(&request).await }))
    }

    async fn on_open(&mut self, mut transport: C::Transport) -> Phase<C::Transport> {
        self.attempt = 0;
        self.strategy.reset();
        self.state.set(ChannelState::Connected);

        // Fire-and-forget: nothing waits for an acknowledgement
        match self.auth.auth_message().await {
            Ok(Some(frame)) => match transport.send(frame).await {
                Ok(()) => {
                    self.metrics.increment_sent();
                    debug!(channel = %self.id, "Sent authentication message");
                }
                Err(e) => {
                    warn!(channel = %self.id, error = %e, "Failed to send auth");
                    self.sink.emit(Notification::ConnectionError {
                        channel: self.id,
                        error: e.to_string(),
                    });
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(channel = %self.id, error = %e, "Failed to build auth message");
                self.sink.emit(Notification::ConnectionError {
                    channel: self.id,
                    error: e.to_string(),
                });
            }
        }

        info!(channel = %self.id, url = %self.request.url, "Connected");
        self.sink.emit(Notification::Connection {
            channel: self.id,
            description: format!("{} engine connected", self.id),
        });
        Phase::Connected(transport)
    }

    fn on_connect_failed(&mut self, e: IoTransitError) -> Phase<C::Transport> {
        self.state.set(ChannelState::Closed);
        error!(channel = %self.id, error = %e, "Failed to connect");
        self.sink.emit(Notification::ConnectionFailed {
            channel: self.id,
            reason: e.to_string(),
        });
        Phase::Closed(self.schedule_retry())
    }

    fn on_closed(&mut self, reason: Option<String>) -> Phase<C::Transport> {
        self.state.set(ChannelState::Closed);
        let reason = reason.unwrap_or_else(|| format!("{} engine connection closed", self.id));
        warn!(channel = %self.id, reason = %reason, "Connection closed");
        self.sink.emit(Notification::ConnectionClose {
            channel: self.id,
            reason,
        });
        Phase::Closed(self.schedule_retry())
    }

    /// Explicit local drop: reported like any close, but never retried
    async fn on_disconnect(&mut self, mut transport: C::Transport) -> Phase<C::Transport> {
        if let Err(e) = transport.close().await {
            debug!(channel = %self.id, error = %e, "Close failed, dropping transport");
        }
        drop(transport);

        self.state.set(ChannelState::Idle);
        info!(channel = %self.id, "Disconnected by client");
        self.sink.emit(Notification::ConnectionClose {
            channel: self.id,
            reason: format!("{} engine connection closed by client", self.id),
        });
        Phase::Idle
    }

    fn on_text(&mut self, text: &str) {
        self.metrics.increment_received();
        match serde_json::from_str::<Value>(text) {
            Ok(payload) => self.sink.emit(self.id.message(payload)),
            Err(e) => {
                warn!(channel = %self.id, error = %e, "Dropping malformed text frame");
                self.sink.emit(Notification::ConnectionError {
                    channel: self.id,
                    error: format!("malformed message: {}", e),
                });
            }
        }
    }

    async fn write(&mut self, transport: &mut C::Transport, payload: String) {
        match transport.send(Frame::Text(payload)).await {
            Ok(()) => self.metrics.increment_sent(),
            Err(e) => {
                warn!(channel = %self.id, error = %e, "Send failed");
                self.sink.emit(Notification::ConnectionError {
                    channel: self.id,
                    error: e.to_string(),
                });
            }
        }
    }

    fn schedule_retry(&mut self) -> Option<Pin<Box<Sleep>>> {
        match self.strategy.next_delay(self.attempt) {
            Some(delay) => {
                self.attempt += 1;
                info!(
                    channel = %self.id,
                    attempt = self.attempt,
                    "Reconnecting in {:?}",
                    delay
                );
                Some(Box::pin(tokio::time::sleep(delay)))
            }
            None => {
                info!(channel = %self.id, "Auto-reconnect disabled, channel stays closed");
                None
            }
        }
    }
}

async fn wait_retry(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
