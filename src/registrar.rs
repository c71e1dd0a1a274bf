//! Webhook Registration
//!
//! Tells the Bot API where to deliver updates. The only recoverable failure
//! is flood control: the server answers with `retry_after` seconds, we
//! sleep that long and repeat the identical call. Anything else aborts
//! startup.
//!
//! ```text
//! Idle -> Attempting --ok--------------> Success
//!            ^   |
//!            |   +--retry_after(d)----> RateLimited --sleep(d)--+
//!            |   |                                              |
//!            |   +--other error-------> Fatal                   |
//!            +----------------------------------------------------+
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{WebhookConfig, WEBHOOK_PATH};
use crate::error::{ConfigError, RegistrationError, TelegramError, TelegramResult};
use crate::telegram::BotApi;

/// Outcome of a single `setWebhook` call
#[derive(Debug)]
pub enum RegistrationAttempt {
    /// The platform accepted the webhook
    Success,
    /// Flood control; retry after the given delay
    RetryAfter(Duration),
    /// Non-retryable failure
    Fatal(TelegramError),
}

impl RegistrationAttempt {
    /// Classify a raw Bot API result
    pub fn from_result(result: TelegramResult<bool>) -> Self {
        match result {
            Ok(true) => RegistrationAttempt::Success,
            Ok(false) => RegistrationAttempt::Fatal(TelegramError::InvalidResponse(
                "setWebhook returned false".to_string(),
            )),
            Err(TelegramError::RetryAfter { retry_after, .. }) => {
                RegistrationAttempt::RetryAfter(Duration::from_secs(retry_after))
            }
            Err(e) => RegistrationAttempt::Fatal(e),
        }
    }
}

/// Append [`WEBHOOK_PATH`] to `url` unless it already ends with it.
///
/// Trailing slashes are stripped first, so `https://host/`,
/// `https://host` and `https://host/webhook/` all normalize to
/// `https://host/webhook`. Applying it twice is a no-op.
pub fn normalize_webhook_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.ends_with(WEBHOOK_PATH) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{WEBHOOK_PATH}")
    }
}

/// Registers the webhook, retrying through flood control
pub struct WebhookRegistrar<A: BotApi> {
    api: Arc<A>,
    max_attempts: Option<u32>,
}

impl<A: BotApi> WebhookRegistrar<A> {
    /// Registrar that retries flood control indefinitely
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            max_attempts: None,
        }
    }

    /// Give up with `RetryBudgetExceeded` after `max_attempts` rate-limited calls
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Register `config.url` (normalized) with `config.secret_token`.
    ///
    /// # Errors
    ///
    /// - `RegistrationError::Config` if the URL is empty; no call is made.
    /// - `RegistrationError::Platform` for any non-flood-control failure.
    /// - `RegistrationError::RetryBudgetExceeded` if a cap is set and reached.
    pub async fn register(&self, config: &WebhookConfig) -> Result<(), RegistrationError> {
        if config.url.trim().is_empty() {
            return Err(ConfigError::MissingWebhookUrl.into());
        }

        let url = normalize_webhook_url(&config.url);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            info!(url = %url, attempt, "Registering webhook");

            let result = self.api.set_webhook(&url, &config.secret_token).await;

            match RegistrationAttempt::from_result(result) {
                RegistrationAttempt::Success => {
                    info!(url = %url, attempts = attempt, "Webhook registered");
                    return Ok(());
                }
                RegistrationAttempt::RetryAfter(delay) => {
                    if self.max_attempts.is_some_and(|max| attempt >= max) {
                        warn!(
                            attempts = attempt,
                            "Flood control outlasted the registration retry budget"
                        );
                        return Err(RegistrationError::RetryBudgetExceeded { attempts: attempt });
                    }

                    warn!(
                        attempt,
                        wait_secs = delay.as_secs(),
                        "Flood control exceeded, retrying webhook registration"
                    );
                    tokio::time::sleep(delay).await;
                }
                RegistrationAttempt::Fatal(e) => {
                    tracing::error!(attempt, error = %e, "Webhook registration failed");
                    return Err(RegistrationError::Platform(e));
                }
            }
        }
    }
}
