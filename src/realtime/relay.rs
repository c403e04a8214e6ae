//! Turn coordination between the learner and the hosted model.

use strum::Display;
use tracing::debug;

use super::events::{ClientEvent, ContentPart, Role, ServerEvent};

/// Where the conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TurnPhase {
    #[default]
    AwaitingUser,
    UserTurnCommitted,
    AssistantResponding,
}

/// How a user turn was authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSource {
    Text,
    Voice,
}

/// Decides when the client must ask the hosted model to reply.
///
/// Typed user items need an explicit `response.create`; spoken items are
/// answered by the hosted side's own voice activity detection.
#[derive(Debug, Default)]
pub struct TurnRelay {
    phase: TurnPhase,
    responses_requested: u64,
}

impl TurnRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Number of `response.create` events this relay has asked for.
    pub fn responses_requested(&self) -> u64 {
        self.responses_requested
    }

    /// Observe one server event and return the event to send back, if any.
    pub fn on_server_event(&mut self, event: &ServerEvent) -> Option<ClientEvent> {
        match event {
            ServerEvent::ConversationItemCreated { item } if item.role == Role::User => {
                match classify_user_item(item.first_part()) {
                    Some(TurnSource::Text) => {
                        self.phase = TurnPhase::UserTurnCommitted;
                        self.responses_requested += 1;
                        debug!(item_id = ?item.id, "text turn committed, requesting response");
                        Some(ClientEvent::response_create())
                    }
                    Some(TurnSource::Voice) => {
                        self.phase = TurnPhase::UserTurnCommitted;
                        debug!(item_id = ?item.id, "voice turn committed, server VAD will respond");
                        None
                    }
                    None => {
                        debug!(item_id = ?item.id, "user item without recognizable content, ignoring");
                        None
                    }
                }
            }
            ServerEvent::ResponseCreated { .. } => {
                self.phase = TurnPhase::AssistantResponding;
                None
            }
            ServerEvent::ResponseDone { .. } => {
                self.phase = TurnPhase::AwaitingUser;
                None
            }
            _ => None,
        }
    }
}

fn classify_user_item(first: Option<&ContentPart>) -> Option<TurnSource> {
    match first? {
        ContentPart::InputText { .. } => Some(TurnSource::Text),
        ContentPart::InputAudio { .. } => Some(TurnSource::Voice),
        _ => None,
    }
}
