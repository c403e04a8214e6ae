//! Convenience re-exports.

pub use crate::clock::SessionClock;
pub use crate::config::{KaiwaConfig, LearnerLevel, PracticeMode, SpeechSettings, Voice};
pub use crate::conversation::{Conversation, ConversationEvent, ConversationOptions};
pub use crate::credential::{
    ClientCredential, CredentialSource, HttpCredentialSource, StaticCredential,
};
pub use crate::error::{KaiwaError, Result};
pub use crate::persistence::{ChatId, HttpChatApi, MessageStore, NewMessage, SavedMessage};
pub use crate::realtime::{ClientEvent, Role, ServerEvent, Turn, TurnRelay};
pub use crate::session::SessionInitiator;
pub use crate::transport::{
    DataChannel, PeerConnection, PeerConnectionFactory, RealtimeConnector, SdpExchange,
    WebRtcConnector,
};
#[cfg(feature = "websocket")]
pub use crate::transport::WebSocketConnector;
