//! Session setup: credential, connection, open wait, session configuration.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::{KaiwaConfig, RealtimeConfiguration};
use crate::credential::CredentialSource;
use crate::error::{KaiwaError, Result};
use crate::realtime::ClientEvent;
use crate::transport::{DataChannel, RealtimeConnector};
use crate::util::timeout::with_timeout;

/// Opens realtime sessions.
///
/// Every failure is terminal for the attempt; callers surface errors for
/// which [`KaiwaError::is_user_facing`] holds as a notification.
#[derive(Clone)]
pub struct SessionInitiator {
    credentials: Arc<dyn CredentialSource>,
    connector: Arc<dyn RealtimeConnector>,
    realtime: RealtimeConfiguration,
    instructions: String,
}

impl SessionInitiator {
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        connector: Arc<dyn RealtimeConnector>,
        config: &KaiwaConfig,
    ) -> Self {
        Self {
            credentials,
            connector,
            realtime: config.realtime.clone(),
            instructions: config.instructions(),
        }
    }

    /// Fetch a credential, connect, wait for the channel, and configure the session.
    pub async fn start(&self) -> Result<Box<dyn DataChannel>> {
        let credential = self.credentials.fetch().await.map_err(|error| {
            warn!(%error, "realtime credential fetch failed");
            error
        })?;
        if credential.is_expired(Utc::now()) {
            return Err(KaiwaError::Authentication(
                "Realtime client credential has already expired".into(),
            ));
        }

        let mut channel = self.connector.connect(&credential, &self.realtime).await?;

        if let Err(error) = self.configure(channel.as_mut()).await {
            warn!(%error, "realtime session setup failed");
            let _ = channel.close().await;
            return Err(error);
        }
        info!(model = %self.realtime.model, "realtime session ready");
        Ok(channel)
    }

    async fn configure(&self, channel: &mut dyn DataChannel) -> Result<()> {
        with_timeout(self.realtime.open_timeout, channel.wait_open()).await?;
        let update = ClientEvent::session_update(&self.realtime, self.instructions.clone());
        channel.send(update.to_json()?).await
    }
}
