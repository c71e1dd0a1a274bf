//! Telegram Bot API surface
//!
//! Wire types for updates and method calls plus a small JSON client.
//! Only the methods the bot uses are implemented: `setWebhook`,
//! `sendMessage` and `setMyCommands`.

pub mod client;
pub mod types;

pub use client::{BotApi, TelegramClient};
pub use types::{ApiResponse, BotCommand, Chat, Message, ResponseParameters, Update, User};
