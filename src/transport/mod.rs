//! Data channel transports to the hosted realtime service.
//!
//! A [`RealtimeConnector`] turns a client credential into an open
//! [`DataChannel`] carrying JSON control events. WebRTC connections go
//! through [`webrtc::WebRtcConnector`], which leaves media capture to a
//! platform [`webrtc::PeerConnection`]; the service is also reachable over
//! a plain WebSocket.

pub mod memory;
pub mod webrtc;
#[cfg(feature = "websocket")]
pub mod websocket;

use async_trait::async_trait;

use crate::config::RealtimeConfiguration;
use crate::credential::ClientCredential;
use crate::error::{KaiwaError, Result};

pub use webrtc::{PeerConnection, PeerConnectionFactory, SdpExchange, WebRtcConnector};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketChannel, WebSocketConnector};

/// A bidirectional text channel for realtime control events.
#[async_trait]
pub trait DataChannel: Send {
    /// Resolve once the channel can carry messages.
    async fn wait_open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Send one text message.
    async fn send(&mut self, payload: String) -> Result<()>;

    /// Receive the next text message, `None` once the channel is closed.
    ///
    /// Implementations must be cancel-safe: the conversation driver polls
    /// this inside `tokio::select!`.
    async fn recv(&mut self) -> Option<Result<String>>;

    /// Close the channel.
    async fn close(&mut self) -> Result<()>;
}

/// Establishes a data channel using a client credential.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(
        &self,
        credential: &ClientCredential,
        config: &RealtimeConfiguration,
    ) -> Result<Box<dyn DataChannel>>;
}

/// Append the `model` query parameter to a realtime endpoint.
pub fn build_realtime_url(base_url: &str, model: &str) -> Result<String> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(KaiwaError::Configuration(
            "Realtime base URL cannot be empty".into(),
        ));
    }
    if model.trim().is_empty() {
        return Err(KaiwaError::Configuration(
            "Realtime model cannot be empty".into(),
        ));
    }
    let separator = if trimmed.contains('?') { "&" } else { "?" };
    Ok(format!("{trimmed}{separator}model={}", model.trim()))
}
