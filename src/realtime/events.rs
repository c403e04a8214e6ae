//! Realtime control events exchanged over the data channel.
//!
//! Client events are serialized with serde; server events are parsed
//! tolerantly from a JSON value so unexpected shapes can be dropped instead
//! of failing the session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

use crate::config::{RealtimeConfiguration, Voice};

/// Author of a conversation item or turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One content part of a conversation item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText {
        #[serde(default)]
        text: String,
    },
    InputAudio {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
    Text {
        #[serde(default)]
        text: String,
    },
    Audio {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// A message item in the hosted conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default = "message_kind")]
    pub kind: String,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

fn message_kind() -> String {
    "message".to_string()
}

impl ConversationItem {
    /// A user message carrying typed text.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: message_kind(),
            role: Role::User,
            content: vec![ContentPart::InputText { text: text.into() }],
        }
    }

    /// The first content part, which decides how a user turn was authored.
    pub fn first_part(&self) -> Option<&ContentPart> {
        self.content.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    pub model: String,
}

/// Session settings sent with `session.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub modalities: Vec<String>,
    pub instructions: String,
    pub voice: Voice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,
    /// `null` disables server-side voice activity detection.
    pub turn_detection: Option<TurnDetection>,
}

/// Options for `response.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseOptions {
    pub modalities: Vec<String>,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            modalities: vec!["audio".to_string(), "text".to_string()],
        }
    }
}

/// Events sent from the client to the hosted service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        session: SessionSettings,
    },
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        item: ConversationItem,
    },
    #[serde(rename = "response.create")]
    ResponseCreate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        response: ResponseOptions,
    },
    #[serde(rename = "response.cancel")]
    ResponseCancel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
}

impl ClientEvent {
    pub fn session_update(config: &RealtimeConfiguration, instructions: String) -> Self {
        Self::SessionUpdate {
            event_id: None,
            session: SessionSettings {
                modalities: config.modalities.clone(),
                instructions,
                voice: config.voice,
                input_audio_transcription: config
                    .input_transcription_model
                    .clone()
                    .map(|model| InputAudioTranscription { model }),
                turn_detection: config.turn_detection.then(|| TurnDetection {
                    kind: "server_vad".to_string(),
                }),
            },
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::ConversationItemCreate {
            event_id: None,
            item: ConversationItem::user_text(text),
        }
    }

    pub fn response_create() -> Self {
        Self::ResponseCreate {
            event_id: None,
            response: ResponseOptions::default(),
        }
    }

    pub fn response_cancel() -> Self {
        Self::ResponseCancel { event_id: None }
    }

    pub fn commit_audio() -> Self {
        Self::InputAudioBufferCommit { event_id: None }
    }

    /// Wire name of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session.update",
            Self::ConversationItemCreate { .. } => "conversation.item.create",
            Self::ResponseCreate { .. } => "response.create",
            Self::ResponseCancel { .. } => "response.cancel",
            Self::InputAudioBufferCommit { .. } => "input_audio_buffer.commit",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Events received from the hosted service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    SessionCreated {
        session_id: String,
    },
    SessionUpdated {
        session_id: Option<String>,
    },
    ConversationItemCreated {
        item: ConversationItem,
    },
    InputTranscriptionCompleted {
        item_id: Option<String>,
        transcript: String,
    },
    SpeechStarted,
    SpeechStopped,
    ResponseCreated {
        response_id: Option<String>,
    },
    TranscriptDelta {
        response_id: Option<String>,
        delta: String,
    },
    TranscriptDone {
        response_id: Option<String>,
        transcript: String,
    },
    ResponseDone {
        response_id: Option<String>,
    },
    Error {
        message: String,
    },
    Unknown {
        event_type: String,
    },
}

impl ServerEvent {
    /// Parse a raw data channel message. Non-JSON input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let value = serde_json::from_str::<Value>(raw).ok()?;
        Self::from_server_payload(&value)
    }

    /// Parse a server event payload into a typed event.
    ///
    /// Returns `None` when the payload has no `type` or is missing a field
    /// the event cannot do without.
    pub fn from_server_payload(payload: &Value) -> Option<Self> {
        let event_type = payload.get("type")?.as_str()?;
        match event_type {
            "session.created" => Some(Self::SessionCreated {
                session_id: string_at(payload, &["session", "id"])
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
            "session.updated" => Some(Self::SessionUpdated {
                session_id: string_at(payload, &["session", "id"]),
            }),
            "conversation.item.created" => {
                let item = payload.get("item")?;
                serde_json::from_value::<ConversationItem>(item.clone())
                    .ok()
                    .map(|item| Self::ConversationItemCreated { item })
            }
            "conversation.item.input_audio_transcription.completed" => {
                string_field(payload, "transcript").map(|transcript| {
                    Self::InputTranscriptionCompleted {
                        item_id: string_field(payload, "item_id"),
                        transcript,
                    }
                })
            }
            "input_audio_buffer.speech_started" => Some(Self::SpeechStarted),
            "input_audio_buffer.speech_stopped" => Some(Self::SpeechStopped),
            "response.created" => Some(Self::ResponseCreated {
                response_id: string_at(payload, &["response", "id"]),
            }),
            "response.audio_transcript.delta" => {
                string_field(payload, "delta").map(|delta| Self::TranscriptDelta {
                    response_id: string_field(payload, "response_id"),
                    delta,
                })
            }
            "response.audio_transcript.done" => Some(Self::TranscriptDone {
                response_id: string_field(payload, "response_id"),
                transcript: string_field(payload, "transcript").unwrap_or_default(),
            }),
            "response.done" => Some(Self::ResponseDone {
                response_id: string_at(payload, &["response", "id"]),
            }),
            "error" => Some(Self::Error {
                message: string_at(payload, &["error", "message"])
                    .or_else(|| string_field(payload, "message"))
                    .unwrap_or_else(|| "Realtime server error".to_string()),
            }),
            _ => Some(Self::Unknown {
                event_type: event_type.to_string(),
            }),
        }
    }

    /// Wire name of this event, for logging.
    pub fn event_type(&self) -> &str {
        match self {
            Self::SessionCreated { .. } => "session.created",
            Self::SessionUpdated { .. } => "session.updated",
            Self::ConversationItemCreated { .. } => "conversation.item.created",
            Self::InputTranscriptionCompleted { .. } => {
                "conversation.item.input_audio_transcription.completed"
            }
            Self::SpeechStarted => "input_audio_buffer.speech_started",
            Self::SpeechStopped => "input_audio_buffer.speech_stopped",
            Self::ResponseCreated { .. } => "response.created",
            Self::TranscriptDelta { .. } => "response.audio_transcript.delta",
            Self::TranscriptDone { .. } => "response.audio_transcript.done",
            Self::ResponseDone { .. } => "response.done",
            Self::Error { .. } => "error",
            Self::Unknown { event_type } => event_type,
        }
    }
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str().map(ToString::to_string)
}
