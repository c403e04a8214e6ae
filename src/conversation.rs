//! Live conversation driver.
//!
//! One task owns the data channel. It relays inbound events to the turn
//! relay and the transcript accumulator, sends whatever the relay asks
//! for, and spawns a persistence call for every appended turn. Saves are
//! fire-and-forget: failures are logged and reported as events, the local
//! history is never rolled back, and saves still in flight when the
//! conversation closes are left to finish on their own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time,
};
use tracing::{debug, info, warn};

use crate::clock::SessionClock;
use crate::error::{KaiwaError, Result};
use crate::persistence::{ChatId, MessageStore, NewMessage};
use crate::realtime::{
    ClientEvent, DisplayMessage, PendingSave, Role, ServerEvent, TranscriptAccumulator, Turn,
    TurnPhase, TurnRelay,
};
use crate::transport::DataChannel;

/// Options for a live conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationOptions {
    /// End the conversation after this long.
    pub time_limit: Option<Duration>,
}

/// Notifications published by a running conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    SessionUpdated,
    UserSpeechStarted,
    UserTurn { index: usize, text: String },
    ResponseRequested,
    AssistantDelta { text: String },
    AssistantTurn { index: usize, text: String },
    MessageSaved {
        index: usize,
        reading: Option<String>,
        english: Option<String>,
    },
    PersistenceFailed { index: usize, message: String },
    ServiceError { message: String },
    TimeLimitReached { elapsed: Duration },
    Closed,
}

#[derive(Debug, Default)]
struct ConversationState {
    relay: TurnRelay,
    transcript: TranscriptAccumulator,
}

type SharedState = Arc<Mutex<ConversationState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, ConversationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Command {
    Send {
        event: ClientEvent,
        ack: oneshot::Sender<Result<()>>,
    },
    /// A typed learner turn; recorded only once the item is on the wire.
    SendText {
        text: String,
        ack: oneshot::Sender<Result<()>>,
    },
}

struct ConversationRuntime {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Spawns saves for appended turns and folds results back into the state.
#[derive(Clone)]
struct Persister {
    store: Arc<dyn MessageStore>,
    chat_id: ChatId,
    state: SharedState,
    events_tx: mpsc::UnboundedSender<ConversationEvent>,
}

impl Persister {
    fn spawn(&self, pending: PendingSave) {
        let this = self.clone();
        tokio::spawn(async move {
            let index = pending.index;
            let message = NewMessage::builder()
                .chat_id(this.chat_id)
                .sender(pending.sender)
                .message(pending.message)
                .build();
            match this.store.save(message).await {
                Ok(saved) => {
                    lock(&this.state).transcript.apply_saved(index, &saved);
                    let _ = this.events_tx.send(ConversationEvent::MessageSaved {
                        index,
                        reading: saved.reading,
                        english: saved.english,
                    });
                }
                Err(error) => {
                    warn!(chat_id = %this.chat_id, index, %error, "failed to persist message");
                    let _ = this.events_tx.send(ConversationEvent::PersistenceFailed {
                        index,
                        message: error.to_string(),
                    });
                }
            }
        });
    }
}

/// A running realtime conversation bound to one chat.
pub struct Conversation {
    chat_id: ChatId,
    clock: SessionClock,
    state: SharedState,
    commands_tx: mpsc::UnboundedSender<Command>,
    events_rx: mpsc::UnboundedReceiver<ConversationEvent>,
    runtime: Option<ConversationRuntime>,
}

impl Conversation {
    /// Start driving an open data channel. Must be called inside a Tokio runtime.
    pub fn start(
        channel: Box<dyn DataChannel>,
        chat_id: ChatId,
        store: Arc<dyn MessageStore>,
        options: ConversationOptions,
    ) -> Self {
        let state = SharedState::default();
        let clock = SessionClock::start(options.time_limit);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let persister = Persister {
            store,
            chat_id,
            state: Arc::clone(&state),
            events_tx,
        };
        let task = tokio::spawn(run_conversation(
            channel,
            commands_rx,
            shutdown_rx,
            persister,
            clock,
        ));
        info!(%chat_id, "conversation started");

        Self {
            chat_id,
            clock,
            state,
            commands_tx,
            events_rx,
            runtime: Some(ConversationRuntime { shutdown_tx, task }),
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    /// Send a typed learner message and record it locally.
    ///
    /// The hosted side echoes the item back, which makes the relay request
    /// a response.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(KaiwaError::InvalidArgument("Message cannot be empty".into()));
        }
        self.request(|ack| Command::SendText { text, ack }).await
    }

    /// Commit buffered microphone audio as a user turn (manual turn taking).
    pub async fn commit_audio(&self) -> Result<()> {
        self.send(ClientEvent::commit_audio()).await
    }

    /// Interrupt the assistant's in-flight response.
    pub async fn cancel_response(&self) -> Result<()> {
        self.send(ClientEvent::response_cancel()).await
    }

    /// Send a raw client event through the driver.
    pub async fn send(&self, event: ClientEvent) -> Result<()> {
        self.request(|ack| Command::Send { event, ack }).await
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<()>>) -> Command,
    ) -> Result<()> {
        let (ack, ack_rx) = oneshot::channel();
        self.commands_tx
            .send(command(ack))
            .map_err(|_| KaiwaError::InvalidState("Conversation is closed".into()))?;
        ack_rx
            .await
            .map_err(|_| KaiwaError::InvalidState("Conversation is closed".into()))?
    }

    /// Wait for the next conversation event.
    ///
    /// Returns `None` after [`ConversationEvent::Closed`] once saves still
    /// in flight have reported.
    pub async fn next_event(&mut self) -> Option<ConversationEvent> {
        self.events_rx.recv().await
    }

    pub fn history(&self) -> Vec<Turn> {
        lock(&self.state).transcript.history().to_vec()
    }

    pub fn display_messages(&self) -> Vec<DisplayMessage> {
        lock(&self.state).transcript.display_messages().to_vec()
    }

    pub fn phase(&self) -> TurnPhase {
        lock(&self.state).relay.phase()
    }

    pub fn responses_requested(&self) -> u64 {
        lock(&self.state).relay.responses_requested()
    }

    /// Stop the driver and close the data channel.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(runtime) = self.runtime.take() {
            let _ = runtime.shutdown_tx.send(true);
            runtime.task.await.map_err(|error| {
                KaiwaError::Transport(format!("Conversation task failed: {error}"))
            })?;
        }
        Ok(())
    }
}

impl Drop for Conversation {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = runtime.shutdown_tx.send(true);
        }
    }
}

async fn run_conversation(
    mut channel: Box<dyn DataChannel>,
    mut commands_rx: mpsc::UnboundedReceiver<Command>,
    mut shutdown_rx: watch::Receiver<bool>,
    persister: Persister,
    clock: SessionClock,
) {
    let events_tx = persister.events_tx.clone();
    let limit = async {
        match clock.deadline() {
            Some(deadline) => time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(limit);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = &mut limit => {
                info!(chat_id = %persister.chat_id, elapsed = %clock.display(), "session time limit reached");
                let _ = events_tx.send(ConversationEvent::TimeLimitReached {
                    elapsed: clock.elapsed(),
                });
                break;
            }
            command = commands_rx.recv() => {
                match command {
                    Some(Command::Send { event, ack }) => {
                        let _ = ack.send(send_event(channel.as_mut(), &event).await);
                    }
                    Some(Command::SendText { text, ack }) => {
                        let _ = ack.send(send_user_text(channel.as_mut(), text, &persister).await);
                    }
                    None => break,
                }
            }
            inbound = channel.recv() => {
                match inbound {
                    Some(Ok(raw)) => {
                        if let Err(error) = handle_inbound(&raw, channel.as_mut(), &persister).await {
                            let _ = events_tx.send(ConversationEvent::ServiceError {
                                message: error.to_string(),
                            });
                            break;
                        }
                    }
                    Some(Err(error)) => {
                        warn!(%error, "realtime channel failed");
                        let _ = events_tx.send(ConversationEvent::ServiceError {
                            message: error.to_string(),
                        });
                        break;
                    }
                    None => {
                        debug!("realtime channel closed by peer");
                        break;
                    }
                }
            }
        }
    }

    if let Err(error) = channel.close().await {
        debug!(%error, "error while closing realtime channel");
    }
    info!(chat_id = %persister.chat_id, elapsed = %clock.display(), "conversation closed");
    let _ = events_tx.send(ConversationEvent::Closed);
}

async fn send_event(channel: &mut dyn DataChannel, event: &ClientEvent) -> Result<()> {
    debug!(event_type = event.event_type(), "sending realtime event");
    channel.send(event.to_json()?).await
}

async fn send_user_text(
    channel: &mut dyn DataChannel,
    text: String,
    persister: &Persister,
) -> Result<()> {
    send_event(channel, &ClientEvent::user_text(text.clone())).await?;
    let pending = lock(&persister.state).transcript.record_user_text(text);
    if let Some(pending) = pending {
        let _ = persister.events_tx.send(ConversationEvent::UserTurn {
            index: pending.index,
            text: pending.message.clone(),
        });
        persister.spawn(pending);
    }
    Ok(())
}

async fn handle_inbound(
    raw: &str,
    channel: &mut dyn DataChannel,
    persister: &Persister,
) -> Result<()> {
    let Some(event) = ServerEvent::parse(raw) else {
        debug!(len = raw.len(), "ignoring malformed realtime event");
        return Ok(());
    };
    debug!(event_type = event.event_type(), "realtime event received");

    let (reply, pending) = {
        let mut state = lock(&persister.state);
        let reply = state.relay.on_server_event(&event);
        let pending = state.transcript.on_server_event(&event);
        (reply, pending)
    };

    let events_tx = &persister.events_tx;
    match &event {
        ServerEvent::SessionUpdated { .. } => {
            let _ = events_tx.send(ConversationEvent::SessionUpdated);
        }
        ServerEvent::SpeechStarted => {
            let _ = events_tx.send(ConversationEvent::UserSpeechStarted);
        }
        ServerEvent::TranscriptDelta { delta, .. } => {
            let _ = events_tx.send(ConversationEvent::AssistantDelta {
                text: delta.clone(),
            });
        }
        ServerEvent::Error { message } => {
            warn!(%message, "realtime service reported an error");
            let _ = events_tx.send(ConversationEvent::ServiceError {
                message: message.clone(),
            });
        }
        _ => {}
    }

    if let Some(pending) = pending {
        let notice = match pending.sender {
            Role::Assistant => ConversationEvent::AssistantTurn {
                index: pending.index,
                text: pending.message.clone(),
            },
            _ => ConversationEvent::UserTurn {
                index: pending.index,
                text: pending.message.clone(),
            },
        };
        let _ = events_tx.send(notice);
        persister.spawn(pending);
    }

    if let Some(reply) = reply {
        send_event(channel, &reply).await?;
        let _ = events_tx.send(ConversationEvent::ResponseRequested);
    }
    Ok(())
}
