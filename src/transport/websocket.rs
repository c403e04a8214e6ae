//! Realtime data channel over WebSocket.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    time::{self, Instant, Interval, MissedTickBehavior},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info};

use super::{build_realtime_url, DataChannel, RealtimeConnector};
use crate::config::{KaiwaConfig, RealtimeConfiguration};
use crate::credential::ClientCredential;
use crate::error::{KaiwaError, Result};

type RealtimeWebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to the realtime service's WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    base_url: String,
}

impl WebSocketConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &KaiwaConfig) -> Self {
        Self::new(config.realtime_ws_url.clone())
    }
}

#[async_trait]
impl RealtimeConnector for WebSocketConnector {
    async fn connect(
        &self,
        credential: &ClientCredential,
        config: &RealtimeConfiguration,
    ) -> Result<Box<dyn DataChannel>> {
        let url = build_realtime_url(&self.base_url, &config.model)?;
        let socket = connect_realtime_socket(&url, credential.secret()).await?;
        info!(model = %config.model, "realtime websocket connected");
        Ok(Box::new(WebSocketChannel::new(
            socket,
            config.heartbeat_interval,
        )))
    }
}

/// An open WebSocket carrying realtime control events.
///
/// Pings are sent every heartbeat interval while the channel is polled.
pub struct WebSocketChannel {
    socket: RealtimeWebSocket,
    heartbeat: Interval,
    closed: bool,
}

impl WebSocketChannel {
    fn new(socket: RealtimeWebSocket, heartbeat_interval: Duration) -> Self {
        let mut heartbeat = time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            socket,
            heartbeat,
            closed: false,
        }
    }
}

#[async_trait]
impl DataChannel for WebSocketChannel {
    async fn send(&mut self, payload: String) -> Result<()> {
        if self.closed {
            return Err(KaiwaError::Transport("Realtime websocket is closed".into()));
        }
        self.socket
            .send(Message::Text(payload))
            .await
            .map_err(|error| KaiwaError::Transport(format!("Realtime websocket send failed: {error}")))
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        if self.closed {
            return None;
        }
        loop {
            tokio::select! {
                _ = self.heartbeat.tick() => {
                    if let Err(error) = self.socket.send(Message::Ping(Default::default())).await {
                        return Some(Err(KaiwaError::Transport(format!(
                            "Realtime heartbeat failed: {error}"
                        ))));
                    }
                }
                frame = self.socket.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                        Some(Ok(Message::Binary(bytes))) => {
                            if let Ok(text) = String::from_utf8(bytes) {
                                return Some(Ok(text));
                            }
                            debug!("dropping non-UTF-8 binary frame");
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            if let Err(error) = self.socket.send(Message::Pong(payload)).await {
                                return Some(Err(KaiwaError::Transport(format!(
                                    "Realtime pong failed: {error}"
                                ))));
                            }
                        }
                        Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                        Some(Ok(Message::Close(_))) | None => {
                            self.closed = true;
                            return None;
                        }
                        Some(Err(error)) => {
                            self.closed = true;
                            return Some(Err(KaiwaError::Transport(format!(
                                "Realtime websocket receive failed: {error}"
                            ))));
                        }
                    }
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            let _ = self.socket.send(Message::Close(None)).await;
        }
        Ok(())
    }
}

async fn connect_realtime_socket(url: &str, api_key: &str) -> Result<RealtimeWebSocket> {
    let mut request = url.into_client_request().map_err(|error| {
        KaiwaError::Configuration(format!("Invalid realtime websocket URL: {error}"))
    })?;
    let auth_value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|error| {
        KaiwaError::Configuration(format!("Invalid realtime auth header: {error}"))
    })?;
    request.headers_mut().insert("Authorization", auth_value);
    request
        .headers_mut()
        .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

    connect_async(request)
        .await
        .map(|(socket, _)| socket)
        .map_err(map_connect_error)
}

fn map_connect_error(error: WsError) -> KaiwaError {
    match error {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            if matches!(status, 401 | 403) {
                KaiwaError::Authentication(format!(
                    "Realtime websocket authentication failed with status {status}"
                ))
            } else {
                KaiwaError::api(
                    status,
                    format!("Realtime websocket handshake failed with status {status}"),
                )
            }
        }
        WsError::Io(error) => KaiwaError::Io(error),
        WsError::Url(error) => {
            KaiwaError::Configuration(format!("Invalid realtime websocket URL: {error}"))
        }
        other => KaiwaError::Transport(format!("Realtime websocket connect failed: {other}")),
    }
}
