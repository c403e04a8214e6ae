//! Local conversation history built from finalized transcripts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::{Role, ServerEvent};
use crate::persistence::SavedMessage;

/// One utterance in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A message as shown to the learner, enriched after it is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub role: Role,
    pub text: String,
    pub reading: Option<String>,
    pub english: Option<String>,
}

/// A turn that was appended locally and still has to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    /// Position in both the history and the display list.
    pub index: usize,
    pub sender: Role,
    pub message: String,
}

/// Accumulates transcript deltas and appends finalized turns.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    history: Vec<Turn>,
    display: Vec<DisplayMessage>,
    partial: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one server event; returns the turn to persist when one was appended.
    pub fn on_server_event(&mut self, event: &ServerEvent) -> Option<PendingSave> {
        match event {
            ServerEvent::ResponseCreated { .. } => {
                self.partial.clear();
                None
            }
            ServerEvent::TranscriptDelta { delta, .. } => {
                self.partial.push_str(delta);
                None
            }
            ServerEvent::TranscriptDone { transcript, .. } => {
                let buffered = std::mem::take(&mut self.partial);
                let text = if transcript.trim().is_empty() {
                    buffered
                } else {
                    transcript.clone()
                };
                self.append(Role::Assistant, text)
            }
            ServerEvent::InputTranscriptionCompleted { transcript, .. } => {
                self.append(Role::User, transcript.clone())
            }
            _ => None,
        }
    }

    /// Record a typed user message.
    pub fn record_user_text(&mut self, text: impl Into<String>) -> Option<PendingSave> {
        self.append(Role::User, text.into())
    }

    /// Merge reading and translation returned by the persistence API.
    ///
    /// Returns `false` when `index` does not name a known message.
    pub fn apply_saved(&mut self, index: usize, saved: &SavedMessage) -> bool {
        let Some(message) = self.display.get_mut(index) else {
            return false;
        };
        if saved.reading.is_some() {
            message.reading = saved.reading.clone();
        }
        if saved.english.is_some() {
            message.english = saved.english.clone();
        }
        true
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn display_messages(&self) -> &[DisplayMessage] {
        &self.display
    }

    /// Assistant transcript received so far for the in-flight response.
    pub fn partial_transcript(&self) -> &str {
        &self.partial
    }

    pub fn last_assistant_turn(&self) -> Option<&Turn> {
        self.history
            .iter()
            .rev()
            .find(|turn| turn.role == Role::Assistant)
    }

    fn append(&mut self, role: Role, text: String) -> Option<PendingSave> {
        if text.trim().is_empty() {
            return None;
        }
        let index = self.history.len();
        self.history.push(Turn {
            role,
            content: text.clone(),
            created_at: Utc::now(),
        });
        self.display.push(DisplayMessage {
            role,
            text: text.clone(),
            reading: None,
            english: None,
        });
        Some(PendingSave {
            index,
            sender: role,
            message: text,
        })
    }
}
