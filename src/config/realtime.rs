//! Realtime session configuration.

use std::time::Duration;

use super::speech::Voice;

pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";
pub const DEFAULT_DATA_CHANNEL_LABEL: &str = "oai-events";

/// Output modalities requested from the hosted model.
pub const DEFAULT_MODALITIES: [&str; 2] = ["audio", "text"];

/// Configuration for a realtime conversation session.
#[derive(Debug, Clone)]
pub struct RealtimeConfiguration {
    pub model: String,
    pub voice: Voice,
    /// Overrides the instructions derived from speech settings.
    pub instructions: Option<String>,
    pub modalities: Vec<String>,
    /// Let the hosted side detect the end of spoken turns.
    pub turn_detection: bool,
    pub input_transcription_model: Option<String>,
    pub data_channel_label: String,
    pub open_timeout: Duration,
    pub request_timeout: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for RealtimeConfiguration {
    fn default() -> Self {
        Self {
            model: DEFAULT_REALTIME_MODEL.to_string(),
            voice: Voice::default(),
            instructions: None,
            modalities: DEFAULT_MODALITIES.iter().map(ToString::to_string).collect(),
            turn_detection: true,
            input_transcription_model: Some("whisper-1".to_string()),
            data_channel_label: DEFAULT_DATA_CHANNEL_LABEL.to_string(),
            open_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(20),
        }
    }
}
