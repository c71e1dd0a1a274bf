//! Bot API HTTP client

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{TelegramError, TelegramResult};
use crate::telegram::types::{
    ApiResponse, BotCommand, Message, SendMessageParams, SetMyCommandsParams, SetWebhookParams,
};

/// Per-call timeout for Bot API requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The subset of the Bot API the bot relies on.
///
/// The registrar and the echo bot depend on this trait rather than on
/// [`TelegramClient`] so they can run against an in-memory double.
#[async_trait::async_trait]
pub trait BotApi: Send + Sync + 'static {
    /// Register `url` as the update delivery target
    async fn set_webhook(&self, url: &str, secret_token: &str) -> TelegramResult<bool>;

    /// Send a text message, optionally as a reply
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> TelegramResult<Message>;

    /// Replace the bot's command menu
    async fn set_my_commands(&self, commands: &[BotCommand]) -> TelegramResult<bool>;
}

/// `reqwest`-backed Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl TelegramClient {
    /// Create a client for `token` against `base_url`
    /// (normally `https://api.telegram.org`).
    pub fn new(token: impl Into<String>, base_url: Url) -> TelegramResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    /// Full URL of a Bot API method
    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.token,
            method
        )
    }

    /// POST `params` as JSON to `method` and decode the response envelope.
    ///
    /// Error envelopes come back with non-2xx statuses, so the body is
    /// decoded regardless of status.
    async fn call<P, R>(&self, method: &str, params: &P) -> TelegramResult<R>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        let envelope: ApiResponse<R> = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;

        debug!(method, status = status.as_u16(), ok = envelope.ok, "Bot API call finished");
        envelope.into_result()
    }
}

// The token is part of every request URL; keep it out of Debug output.
impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait::async_trait]
impl BotApi for TelegramClient {
    #[instrument(skip_all, fields(url = %url))]
    async fn set_webhook(&self, url: &str, secret_token: &str) -> TelegramResult<bool> {
        self.call("setWebhook", &SetWebhookParams { url, secret_token })
            .await
    }

    #[instrument(skip(self, text))]
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> TelegramResult<Message> {
        self.call(
            "sendMessage",
            &SendMessageParams {
                chat_id,
                text,
                reply_to_message_id,
            },
        )
        .await
    }

    #[instrument(skip_all)]
    async fn set_my_commands(&self, commands: &[BotCommand]) -> TelegramResult<bool> {
        self.call("setMyCommands", &SetMyCommandsParams { commands })
            .await
    }
}
