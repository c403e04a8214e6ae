//! Shared test helpers: in-memory stores and event waiting.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{timeout, Instant};

use kaiwa::conversation::{Conversation, ConversationEvent};
use kaiwa::error::{KaiwaError, Result};
use kaiwa::persistence::{MessageStore, NewMessage, SavedMessage};

/// Records every save and answers with a canned reading and translation.
#[derive(Default)]
pub struct RecordingStore {
    saved: Mutex<Vec<NewMessage>>,
    reply: SavedMessage,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replying(reading: &str, english: &str) -> Arc<Self> {
        Arc::new(Self {
            saved: Mutex::new(Vec::new()),
            reply: SavedMessage {
                reading: Some(reading.to_string()),
                english: Some(english.to_string()),
            },
        })
    }

    pub fn saved(&self) -> Vec<NewMessage> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageStore for RecordingStore {
    async fn save(&self, message: NewMessage) -> Result<SavedMessage> {
        self.saved.lock().unwrap().push(message);
        Ok(self.reply.clone())
    }
}

/// Fails every save as if the network were down.
pub struct FailingStore;

#[async_trait]
impl MessageStore for FailingStore {
    async fn save(&self, _message: NewMessage) -> Result<SavedMessage> {
        Err(KaiwaError::Transport("simulated network error".into()))
    }
}

/// Wait for the first event matching `predicate`, skipping others.
pub async fn wait_for_event<F>(
    conversation: &mut Conversation,
    max_wait: Duration,
    mut predicate: F,
) -> ConversationEvent
where
    F: FnMut(&ConversationEvent) -> bool,
{
    let deadline = Instant::now() + max_wait;
    loop {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .expect("event did not arrive before timeout");
        let event = timeout(remaining, conversation.next_event())
            .await
            .expect("waiting for event should not timeout")
            .expect("event stream should stay open");
        if predicate(&event) {
            return event;
        }
    }
}
