//! Kaiwa: realtime Japanese conversation practice client.
//!
//! Connects a learner to a hosted realtime conversational model, keeps
//! spoken and typed turns alternating, and saves every finalized utterance
//! to the practice backend.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kaiwa::prelude::*;
//!
//! # async fn example() -> kaiwa::error::Result<()> {
//! let config = KaiwaConfig::from_env()?.with_api_key("sk-...");
//! let chat_api = Arc::new(HttpChatApi::new(&config)?);
//! let chat_id = chat_api.create_chat(config.speech.mode).await?;
//!
//! let initiator = SessionInitiator::new(
//!     Arc::new(StaticCredential::from_config(&config)?),
//!     Arc::new(WebSocketConnector::from_config(&config)),
//!     &config,
//! );
//! let channel = initiator.start().await?;
//! let mut conversation =
//!     Conversation::start(channel, chat_id, chat_api, ConversationOptions::default());
//!
//! conversation.send_text("こんにちは！").await?;
//! while let Some(event) = conversation.next_event().await {
//!     if let ConversationEvent::AssistantTurn { text, .. } = event {
//!         println!("{text}");
//!         break;
//!     }
//! }
//! conversation.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod conversation;
pub mod credential;
pub mod error;
pub mod http;
pub mod persistence;
pub mod prelude;
pub mod realtime;
pub mod session;
pub mod transport;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
