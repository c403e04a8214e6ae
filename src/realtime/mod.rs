//! Realtime event vocabulary, turn coordination, and transcript history.

pub mod events;
pub mod relay;
pub mod transcript;

pub use events::{ClientEvent, ContentPart, ConversationItem, Role, ServerEvent};
pub use relay::{TurnPhase, TurnRelay, TurnSource};
pub use transcript::{DisplayMessage, PendingSave, TranscriptAccumulator, Turn};
