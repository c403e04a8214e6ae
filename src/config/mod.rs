//! Configuration system (layered: code > env > TOML file > defaults).

pub mod realtime;
pub mod speech;

pub use realtime::{RealtimeConfiguration, DEFAULT_REALTIME_MODEL};
pub use speech::{LearnerLevel, PracticeMode, SpeechSettings, Voice};

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{KaiwaError, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_REALTIME_URL: &str = "https://api.openai.com/v1/realtime";
pub const DEFAULT_REALTIME_WS_URL: &str = "wss://api.openai.com/v1/realtime";

/// Top-level configuration for a Kaiwa client.
#[derive(Clone)]
pub struct KaiwaConfig {
    /// Base URL of the backend serving `/api/session`, `/api/messages`, etc.
    pub api_base_url: String,
    /// HTTPS endpoint accepting SDP offers.
    pub realtime_url: String,
    /// WebSocket endpoint of the same service.
    pub realtime_ws_url: String,
    /// Long-lived key, only used by the WebSocket transport.
    pub api_key: Option<String>,
    pub realtime: RealtimeConfiguration,
    pub speech: SpeechSettings,
}

impl fmt::Debug for KaiwaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KaiwaConfig")
            .field("api_base_url", &self.api_base_url)
            .field("realtime_url", &self.realtime_url)
            .field("realtime_ws_url", &self.realtime_ws_url)
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("realtime", &self.realtime)
            .field("speech", &self.speech)
            .finish()
    }
}

impl Default for KaiwaConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            realtime_url: DEFAULT_REALTIME_URL.to_string(),
            realtime_ws_url: DEFAULT_REALTIME_WS_URL.to_string(),
            api_key: None,
            realtime: RealtimeConfiguration::default(),
            speech: SpeechSettings::default(),
        }
    }
}

/// Shape of the optional `kaiwa.toml` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    api_base_url: Option<String>,
    realtime_url: Option<String>,
    realtime_ws_url: Option<String>,
    model: Option<String>,
    instructions: Option<String>,
    turn_detection: Option<bool>,
    open_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    speech: Option<SpeechSettings>,
}

impl KaiwaConfig {
    /// Load defaults, then `path` if given, then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from environment variables on top of defaults.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Parse a TOML document on top of defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(raw)
            .map_err(|error| KaiwaError::Configuration(format!("Invalid config file: {error}")))?;

        let mut config = Self::default();
        if let Some(url) = file.api_base_url {
            config.api_base_url = url;
        }
        if let Some(url) = file.realtime_url {
            config.realtime_url = url;
        }
        if let Some(url) = file.realtime_ws_url {
            config.realtime_ws_url = url;
        }
        if let Some(model) = file.model {
            config.realtime.model = model;
        }
        if file.instructions.is_some() {
            config.realtime.instructions = file.instructions;
        }
        if let Some(enabled) = file.turn_detection {
            config.realtime.turn_detection = enabled;
        }
        if let Some(secs) = file.open_timeout_secs {
            config.realtime.open_timeout = std::time::Duration::from_secs(secs);
        }
        if let Some(secs) = file.request_timeout_secs {
            config.realtime.request_timeout = std::time::Duration::from_secs(secs);
        }
        if let Some(speech) = file.speech {
            config.realtime.voice = speech.voice;
            config.speech = speech;
        }
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty("KAIWA_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(url) = non_empty("KAIWA_REALTIME_URL") {
            self.realtime_url = url;
        }
        if let Some(url) = non_empty("KAIWA_REALTIME_WS_URL") {
            self.realtime_ws_url = url;
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty("KAIWA_REALTIME_MODEL") {
            self.realtime.model = model;
        }
        if let Some(voice) = non_empty("KAIWA_VOICE") {
            let voice = Voice::from_str(voice.trim()).map_err(|_| {
                KaiwaError::Configuration(format!("Unknown voice in KAIWA_VOICE: {voice}"))
            })?;
            self.speech.voice = voice;
            self.realtime.voice = voice;
        }
        self.validate()
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_realtime_url(mut self, url: impl Into<String>) -> Self {
        self.realtime_url = url.into();
        self
    }

    pub fn with_realtime_ws_url(mut self, url: impl Into<String>) -> Self {
        self.realtime_ws_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_speech(mut self, speech: SpeechSettings) -> Self {
        self.realtime.voice = speech.voice;
        self.speech = speech;
        self
    }

    /// Instructions for `session.update`: explicit override, else derived from speech settings.
    pub fn instructions(&self) -> String {
        self.realtime
            .instructions
            .clone()
            .unwrap_or_else(|| self.speech.instructions())
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("api_base_url", &self.api_base_url),
            ("realtime_url", &self.realtime_url),
            ("realtime_ws_url", &self.realtime_ws_url),
            ("model", &self.realtime.model),
        ] {
            if value.trim().is_empty() {
                return Err(KaiwaError::Configuration(format!("{name} cannot be empty")));
            }
        }
        Ok(())
    }
}
