//! Telegram Bot API client.
//!
//! Covers the three methods the bot needs: `sendMessage` for notifications
//! and command replies, `getChatMember` for the group admin gate, and
//! `getUpdates` for long-polled command input.

pub mod poll;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::dispatch::{MessageSender, SendError};
use crate::subscriptions::ChatMemberGate;
use crate::types::{ChatId, UserId};

/// Long-poll wait passed to `getUpdates`, seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api rejected call: {0}")]
    Api(String),
}

#[derive(Debug, Clone)]
pub struct TelegramApi {
    http: reqwest::Client,
    base: String,
}

/// Envelope every Bot API response uses.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<TgUser>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: String,
}

impl TelegramApi {
    pub fn new(bot_token: &str) -> Self {
        let http = reqwest::Client::builder()
            // Above the long-poll wait so getUpdates is not cut short.
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 15))
            .build()
            .unwrap_or_default();
        TelegramApi {
            http,
            base: format!("https://api.telegram.org/bot{bot_token}"),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, TelegramError> {
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{method}", self.base))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(TelegramError::Api(
                response.description.unwrap_or_else(|| "unknown error".into()),
            ));
        }
        response
            .result
            .ok_or_else(|| TelegramError::Api("ok response without result".into()))
    }

    /// Sends an HTML-formatted message with link previews disabled.
    pub async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                serde_json::json!({
                    "chat_id": chat_id.0,
                    "text": text,
                    "parse_mode": "HTML",
                    "link_preview_options": { "is_disabled": true },
                }),
            )
            .await?;
        Ok(())
    }

    /// Fetches updates after `offset` with a long-poll wait.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            serde_json::json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECS,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    async fn chat_member_status(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<String, TelegramError> {
        let member: ChatMember = self
            .call(
                "getChatMember",
                serde_json::json!({
                    "chat_id": chat_id.0,
                    "user_id": user_id.0,
                }),
            )
            .await?;
        Ok(member.status)
    }
}

#[async_trait]
impl MessageSender for TelegramApi {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), SendError> {
        self.send(chat_id, text)
            .await
            .map_err(|e| SendError(e.to_string()))
    }
}

#[async_trait]
impl ChatMemberGate for TelegramApi {
    /// A failed lookup degrades to "not an admin"; an unverifiable status
    /// never grants access.
    async fn is_chat_admin(&self, chat_id: ChatId, user_id: UserId) -> bool {
        match self.chat_member_status(chat_id, user_id).await {
            Ok(status) => status == "administrator" || status == "creator",
            Err(error) => {
                warn!(chat = %chat_id, user = %user_id, %error, "chat member lookup failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_deserializes() {
        let json = r#"{
            "update_id": 42,
            "message": {
                "message_id": 1,
                "chat": {"id": -100123, "type": "supergroup"},
                "from": {"id": 5, "is_bot": false, "first_name": "Alice"},
                "text": "/subscribe acme/widgets commit"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 42);
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, -100123);
        assert_eq!(message.chat.kind, "supergroup");
        assert_eq!(message.from.unwrap().id, 5);
        assert_eq!(message.text.as_deref(), Some("/subscribe acme/widgets commit"));
    }

    #[test]
    fn non_text_update_tolerated() {
        // Sticker messages have no text; joins have no from on channel posts
        let json = r#"{"update_id": 43, "message": {"message_id": 2, "chat": {"id": 1, "type": "private"}}}"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert!(update.message.unwrap().text.is_none());
    }

    #[test]
    fn api_error_envelope() {
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(
            r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#,
        )
        .unwrap();
        assert!(!response.ok);
        assert_eq!(response.description.as_deref(), Some("Unauthorized"));
        assert!(response.result.is_none());
    }
}
