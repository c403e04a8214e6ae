//! Bridge to the backend's chat and message endpoints.

use std::fmt;

use async_trait::async_trait;
use bon::Builder;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::config::{KaiwaConfig, PracticeMode};
use crate::error::{KaiwaError, Result};
use crate::http::{build_client, join_url, json_headers, status_to_error};
use crate::realtime::Role;

const MESSAGES_PATH: &str = "/api/messages";
const CHATS_PATH: &str = "/api/chats";
const SUMMARY_PATH: &str = "/api/summary";

/// Server-assigned chat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Body of a message save request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub sender: Role,
    #[builder(into)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub reading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub english: Option<String>,
}

/// Fields derived by the backend when a message is saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SavedMessage {
    #[serde(default)]
    pub reading: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
}

/// Persists conversation messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save(&self, message: NewMessage) -> Result<SavedMessage>;
}

/// HTTP client for the backend's chat API.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateChatRequest {
    mode: PracticeMode,
}

#[derive(Debug, Deserialize)]
struct CreateChatResponse {
    id: ChatId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRequest {
    chat_id: ChatId,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: String,
}

impl HttpChatApi {
    pub fn new(config: &KaiwaConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.realtime.request_timeout)?,
            base_url: config.api_base_url.clone(),
        })
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Open a new chat for the given practice mode.
    pub async fn create_chat(&self, mode: PracticeMode) -> Result<ChatId> {
        let response: CreateChatResponse =
            self.post_json(CHATS_PATH, &CreateChatRequest { mode }).await?;
        debug!(chat_id = %response.id, %mode, "chat created");
        Ok(response.id)
    }

    /// Ask the backend to summarize a finished chat.
    pub async fn request_summary(&self, chat_id: ChatId) -> Result<String> {
        let response: SummaryResponse =
            self.post_json(SUMMARY_PATH, &SummaryRequest { chat_id }).await?;
        if response.summary.trim().is_empty() {
            return Err(KaiwaError::api(200, "Summary endpoint returned an empty summary"));
        }
        Ok(response.summary)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = join_url(&self.base_url, path);
        let response = self
            .client
            .post(&url)
            .headers(json_headers(None))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(status_to_error(status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(KaiwaError::from)
    }
}

#[async_trait]
impl MessageStore for HttpChatApi {
    async fn save(&self, message: NewMessage) -> Result<SavedMessage> {
        debug!(chat_id = %message.chat_id, sender = %message.sender, "saving message");
        self.post_json(MESSAGES_PATH, &message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn new_message_uses_camel_case_and_omits_missing_fields() {
        let message = NewMessage::builder()
            .chat_id(ChatId(42))
            .sender(Role::Assistant)
            .message("いらっしゃいませ")
            .build();

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"chatId": 42, "sender": "assistant", "message": "いらっしゃいませ"})
        );
    }

    #[test]
    fn new_message_includes_optional_fields_when_set() {
        let message = NewMessage::builder()
            .chat_id(ChatId(7))
            .sender(Role::User)
            .message("はい")
            .reading("はい")
            .english("Yes")
            .build();

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["reading"], "はい");
        assert_eq!(value["english"], "Yes");
    }

    #[test]
    fn saved_message_tolerates_missing_fields() {
        let saved: SavedMessage = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert_eq!(saved, SavedMessage::default());
    }
}
