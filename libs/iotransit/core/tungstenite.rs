//! tokio-tungstenite backed transport

use crate::traits::*;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, http, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket connections with sub-protocol and origin headers
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    type Transport = TungsteniteTransport;

    async fn connect(&self, request: &ConnectRequest) -> Result<Self::Transport> {
        let mut ws_request = request
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| IoTransitError::ConnectFailed(e.to_string()))?;

        let headers = [
            (http::header::SEC_WEBSOCKET_PROTOCOL, &request.sub_protocol),
            (http::header::ORIGIN, &request.origin),
        ];
        for (name, value) in headers {
            if value.is_empty() {
                continue;
            }
            match value.parse::<http::header::HeaderValue>() {
                Ok(header_value) => {
                    ws_request.headers_mut().insert(name, header_value);
                }
                Err(_) => {
                    warn!("Invalid header value for '{}': {}", name, value);
                }
            }
        }

        let (stream, response) = connect_async(ws_request)
            .await
            .map_err(|e| IoTransitError::ConnectFailed(e.to_string()))?;
        debug!(url = %request.url, status = %response.status(), "WebSocket handshake complete");

        Ok(TungsteniteTransport {
            stream,
            failed: false,
        })
    }
}

/// An open tokio-tungstenite connection
pub struct TungsteniteTransport {
    stream: WsStream,
    /// A read error was reported; the next read reports the close
    failed: bool,
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        self.stream
            .send(frame_to_tungstenite(frame))
            .await
            .map_err(|e| IoTransitError::Transport(e.to_string()))
    }

    async fn next_event(&mut self) -> TransportEvent {
        if self.failed {
            return TransportEvent::Closed(None);
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Message(Frame::Text(text)),
                Some(Ok(Message::Binary(data))) => {
                    return TransportEvent::Message(Frame::Binary(data))
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|reason| !reason.is_empty());
                    return TransportEvent::Closed(reason);
                }
                // Control frames are answered by tungstenite itself
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => {
                    return TransportEvent::Closed(None)
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return TransportEvent::Error(e.to_string());
                }
                None => return TransportEvent::Closed(None),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(IoTransitError::Transport(e.to_string())),
        }
    }
}

fn frame_to_tungstenite(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(data) => Message::Binary(data),
    }
}
