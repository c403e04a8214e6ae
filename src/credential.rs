//! Short-lived client credentials for the hosted realtime service.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::KaiwaConfig;
use crate::error::{KaiwaError, Result};
use crate::http::{build_client, join_url, status_to_error};

const SESSION_PATH: &str = "/api/session";

/// A bearer secret handed to the hosted service during signaling.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredential {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredential")
            .field("secret", &"..")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl ClientCredential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// Something that can hand out a client credential.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch(&self) -> Result<ClientCredential>;
}

/// Fetches an ephemeral key from the backend's session endpoint.
#[derive(Debug, Clone)]
pub struct HttpCredentialSource {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    client_secret: Option<SecretPayload>,
    value: Option<String>,
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    value: String,
    expires_at: Option<i64>,
}

impl HttpCredentialSource {
    pub fn new(config: &KaiwaConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.realtime.request_timeout)?,
            url: join_url(&config.api_base_url, SESSION_PATH),
        })
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn fetch(&self) -> Result<ClientCredential> {
        debug!(url = %self.url, "fetching realtime client credential");
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_to_error(status.as_u16(), &body));
        }

        let parsed: SessionResponse = serde_json::from_str(&body)?;
        let (secret, expires_at) = match parsed.client_secret {
            Some(payload) => (payload.value, payload.expires_at),
            None => (
                parsed.value.unwrap_or_default(),
                parsed.expires_at,
            ),
        };
        if secret.trim().is_empty() {
            return Err(KaiwaError::Authentication(
                "Session endpoint returned no client secret".into(),
            ));
        }

        let mut credential = ClientCredential::new(secret);
        if let Some(expiry) = expires_at.and_then(|secs| DateTime::from_timestamp(secs, 0)) {
            credential = credential.with_expiry(expiry);
        }
        Ok(credential)
    }
}

/// A fixed key, e.g. `OPENAI_API_KEY` for the WebSocket transport.
#[derive(Clone)]
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Use the API key from `config`, failing when none is set.
    pub fn from_config(config: &KaiwaConfig) -> Result<Self> {
        config
            .api_key
            .clone()
            .map(Self)
            .ok_or_else(|| KaiwaError::Authentication("Missing OPENAI_API_KEY".into()))
    }
}

impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticCredential(..)")
    }
}

#[async_trait]
impl CredentialSource for StaticCredential {
    async fn fetch(&self) -> Result<ClientCredential> {
        if self.0.trim().is_empty() {
            return Err(KaiwaError::Authentication("API key cannot be empty".into()));
        }
        Ok(ClientCredential::new(self.0.clone()))
    }
}
