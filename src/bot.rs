//! Echo Bot
//!
//! The update processor behind the webhook:
//!
//! - `/start` replies with a greeting
//! - any other plain text message is echoed back as a reply
//! - other commands and non-message updates are ignored
//!
//! Send failures are returned to the webhook endpoint, which logs them.

use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::telegram::{BotApi, BotCommand, Message, Update};
use crate::webhook::UpdateProcessor;

/// Reply to `/start`
pub const START_REPLY: &str = "Hello! Bot is running with webhooks!";

/// What the bot will do with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Greet the user
    Start,
    /// Send the text back
    Echo(String),
    /// Do nothing
    Ignore,
}

impl Reply {
    /// Decide how to answer `message`
    pub fn for_message(message: &Message) -> Self {
        match message.command() {
            Some("start") => Reply::Start,
            Some(_) => Reply::Ignore,
            None => match &message.text {
                Some(text) => Reply::Echo(text.clone()),
                None => Reply::Ignore,
            },
        }
    }
}

/// Update processor that greets on `/start` and echoes text
pub struct EchoBot<A: BotApi> {
    api: Arc<A>,
}

impl<A: BotApi> EchoBot<A> {
    /// Create a bot talking to `api`
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Commands shown in the client's command menu
    pub fn commands() -> Vec<BotCommand> {
        vec![BotCommand::new("start", "Check that the bot is running")]
    }

    /// Advertise [`Self::commands`] via `setMyCommands`.
    ///
    /// Failure only affects the client menu, so it is logged and swallowed.
    pub async fn register_commands(&self) {
        match self.api.set_my_commands(&Self::commands()).await {
            Ok(_) => info!("Bot commands registered"),
            Err(e) => warn!(error = %e, "Failed to register bot commands"),
        }
    }

    /// Answer a single typed update
    #[instrument(skip_all, fields(update_id = update.update_id))]
    pub async fn handle_update(&self, update: Update) -> anyhow::Result<()> {
        let Some(message) = update.message else {
            debug!("Update carries no new message, ignoring");
            return Ok(());
        };

        let text = match Reply::for_message(&message) {
            Reply::Start => START_REPLY.to_string(),
            Reply::Echo(text) => text,
            Reply::Ignore => {
                debug!(chat_id = message.chat.id, "Nothing to reply to");
                return Ok(());
            }
        };

        self.api
            .send_message(message.chat.id, &text, Some(message.message_id))
            .await
            .with_context(|| format!("failed to reply in chat {}", message.chat.id))?;

        debug!(chat_id = message.chat.id, "Reply sent");
        Ok(())
    }
}

#[async_trait::async_trait]
impl<A: BotApi> UpdateProcessor for EchoBot<A> {
    async fn process(&self, update: Value) -> anyhow::Result<()> {
        let update: Update =
            serde_json::from_value(update).context("payload is not a Bot API update")?;
        self.handle_update(update).await
    }
}
