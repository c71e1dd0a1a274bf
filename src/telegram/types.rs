//! Bot API wire types
//!
//! Only the fields the bot reads are modelled; everything else in an update
//! is ignored on deserialization.

use serde::{Deserialize, Serialize};

use crate::error::{TelegramError, TelegramResult};

/// A single incoming update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Monotonic update identifier
    pub update_id: i64,

    /// New incoming message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier unique within the chat
    pub message_id: i64,

    /// Unix timestamp the message was sent
    #[serde(default)]
    pub date: i64,

    /// Conversation the message belongs to
    pub chat: Chat,

    /// Sender, absent for channel posts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,

    /// UTF-8 text for text messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Message {
    /// The bot command this message starts with, without the leading slash
    /// or `@botname` suffix.
    ///
    /// `"/start@my_bot hello"` yields `Some("start")`; plain text yields `None`.
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?;
        let head = text.strip_prefix('/')?.split_whitespace().next()?;
        let name = head.split('@').next().unwrap_or(head);
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

/// A conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Chat identifier
    pub id: i64,

    /// `private`, `group`, `supergroup` or `channel`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A user or bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User identifier
    pub id: i64,

    /// True for bots
    #[serde(default)]
    pub is_bot: bool,

    /// First name
    #[serde(default)]
    pub first_name: String,

    /// Username without the `@`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A command shown in the client's command menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    /// Command name without the slash
    pub command: String,
    /// Menu description
    pub description: String,
}

impl BotCommand {
    /// Create a new command entry
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

/// `setWebhook` parameters
#[derive(Debug, Clone, Serialize)]
pub struct SetWebhookParams<'a> {
    /// HTTPS URL to deliver updates to
    pub url: &'a str,
    /// Echoed back in `X-Telegram-Bot-Api-Secret-Token`
    pub secret_token: &'a str,
}

/// `sendMessage` parameters
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageParams<'a> {
    /// Target chat
    pub chat_id: i64,
    /// Message text
    pub text: &'a str,
    /// Message being replied to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
}

/// `setMyCommands` parameters
#[derive(Debug, Clone, Serialize)]
pub struct SetMyCommandsParams<'a> {
    /// Commands to advertise
    pub commands: &'a [BotCommand],
}

/// Generic Bot API response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded
    pub ok: bool,

    /// Payload on success
    pub result: Option<T>,

    /// Error code on failure (mirrors the HTTP status)
    #[serde(default)]
    pub error_code: Option<i64>,

    /// Human readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Extra information about a failure
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

/// Failure details the client may act on
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before repeating a flood-controlled request
    #[serde(default)]
    pub retry_after: Option<u64>,
}

impl<T> ApiResponse<T> {
    /// Convert the envelope into a typed result.
    ///
    /// Any failure carrying `parameters.retry_after` is flood control.
    pub fn into_result(self) -> TelegramResult<T> {
        let description = self.description.unwrap_or_default();

        if self.ok {
            return self.result.ok_or_else(|| {
                TelegramError::InvalidResponse("ok response without result".to_string())
            });
        }

        if let Some(retry_after) = self.parameters.and_then(|p| p.retry_after) {
            return Err(TelegramError::RetryAfter {
                retry_after,
                description,
            });
        }

        Err(TelegramError::Api {
            code: self.error_code.unwrap_or_default(),
            description,
        })
    }
}
