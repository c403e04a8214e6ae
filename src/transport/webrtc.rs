//! WebRTC signaling against the hosted realtime service.
//!
//! Media capture and the peer connection itself belong to the platform
//! (browser bindings, a native WebRTC stack, ...). This module drives the
//! handshake: microphone, data channel, offer, SDP exchange over HTTPS,
//! answer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{build_realtime_url, DataChannel, RealtimeConnector};
use crate::config::{KaiwaConfig, RealtimeConfiguration};
use crate::credential::ClientCredential;
use crate::error::{KaiwaError, Result};
use crate::http::{build_client, sdp_headers};

/// A platform WebRTC peer connection.
#[async_trait]
pub trait PeerConnection: Send {
    /// Capture the local microphone and add its audio track.
    async fn attach_microphone(&mut self) -> Result<()>;

    /// Create the data channel for control events. Called before the offer.
    async fn create_data_channel(&mut self, label: &str) -> Result<Box<dyn DataChannel>>;

    /// Create an SDP offer and install it as the local description.
    async fn create_offer(&mut self) -> Result<String>;

    /// Install the remote SDP answer. Remote audio starts flowing after this.
    async fn accept_answer(&mut self, sdp: &str) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Creates peer connections for new sessions.
pub trait PeerConnectionFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn PeerConnection>>;
}

/// Posts an SDP offer to the hosted service and returns its answer.
#[derive(Debug, Clone)]
pub struct SdpExchange {
    client: reqwest::Client,
    base_url: String,
}

impl SdpExchange {
    pub fn new(config: &KaiwaConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.realtime.request_timeout)?,
            base_url: config.realtime_url.clone(),
        })
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn exchange(
        &self,
        offer: &str,
        model: &str,
        credential: &ClientCredential,
    ) -> Result<String> {
        let url = build_realtime_url(&self.base_url, model)?;
        debug!(%url, offer_len = offer.len(), "posting SDP offer");
        let response = self
            .client
            .post(&url)
            .headers(sdp_headers(credential.secret()))
            .body(offer.to_string())
            .send()
            .await
            .map_err(|error| KaiwaError::Signaling(format!("SDP exchange request failed: {error}")))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(KaiwaError::Signaling(format!(
                "SDP exchange failed with status {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }
        if body.trim().is_empty() {
            return Err(KaiwaError::Signaling("SDP exchange returned an empty answer".into()));
        }
        Ok(body)
    }
}

/// Connects by negotiating a WebRTC peer connection.
#[derive(Clone)]
pub struct WebRtcConnector {
    factory: Arc<dyn PeerConnectionFactory>,
    exchange: SdpExchange,
}

impl WebRtcConnector {
    pub fn new(factory: Arc<dyn PeerConnectionFactory>, exchange: SdpExchange) -> Self {
        Self { factory, exchange }
    }
}

#[async_trait]
impl RealtimeConnector for WebRtcConnector {
    async fn connect(
        &self,
        credential: &ClientCredential,
        config: &RealtimeConfiguration,
    ) -> Result<Box<dyn DataChannel>> {
        let mut peer = self.factory.create()?;
        let negotiated = negotiate(peer.as_mut(), &self.exchange, credential, config).await;
        match negotiated {
            Ok(channel) => {
                info!(model = %config.model, "realtime peer connection negotiated");
                Ok(Box::new(PeerChannel { peer, channel }))
            }
            Err(error) => {
                if let Err(close_error) = peer.close().await {
                    warn!(error = %close_error, "failed to close peer after negotiation error");
                }
                Err(error)
            }
        }
    }
}

async fn negotiate(
    peer: &mut dyn PeerConnection,
    exchange: &SdpExchange,
    credential: &ClientCredential,
    config: &RealtimeConfiguration,
) -> Result<Box<dyn DataChannel>> {
    peer.attach_microphone().await?;
    let channel = peer.create_data_channel(&config.data_channel_label).await?;
    let offer = peer.create_offer().await?;
    let answer = exchange.exchange(&offer, &config.model, credential).await?;
    peer.accept_answer(&answer).await?;
    Ok(channel)
}

/// A data channel that keeps its peer connection alive and closes it last.
struct PeerChannel {
    peer: Box<dyn PeerConnection>,
    channel: Box<dyn DataChannel>,
}

#[async_trait]
impl DataChannel for PeerChannel {
    async fn wait_open(&mut self) -> Result<()> {
        self.channel.wait_open().await
    }

    async fn send(&mut self, payload: String) -> Result<()> {
        self.channel.send(payload).await
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        self.channel.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        let channel_result = self.channel.close().await;
        let peer_result = self.peer.close().await;
        channel_result.and(peer_result)
    }
}
