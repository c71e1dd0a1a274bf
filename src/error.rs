//! Error types for the echo webhook bot
//!
//! Startup errors (configuration, webhook registration) are fatal and bubble
//! up to `main`. Per-request failures never surface here; the webhook
//! endpoint turns them into status codes and log events.

use thiserror::Error;

/// The main error type for bot operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bot API errors outside of webhook registration
    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramError),

    /// Webhook registration errors
    #[error("Webhook registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// I/O errors (listener bind, serve)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Missing or invalid startup configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("{0} environment variable not set")]
    MissingVar(&'static str),

    /// A required value is present but empty
    #[error("{0} cannot be empty")]
    EmptyValue(&'static str),

    /// The webhook URL is empty, so there is nothing to register
    #[error("webhook URL is not configured")]
    MissingWebhookUrl,

    /// The webhook URL does not parse
    #[error("Invalid webhook URL {url:?}: {reason}")]
    InvalidUrl {
        /// Offending value
        url: String,
        /// Parser message
        reason: String,
    },

    /// Secret token violates the Bot API format (1-256 chars of `A-Za-z0-9_-`)
    #[error("Invalid secret token: {0}")]
    InvalidSecretToken(String),

    /// Numeric variable failed to parse
    #[error("Invalid value for {var}: {value:?}")]
    InvalidNumber {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },

    /// Listen address failed to parse
    #[error("Invalid listen address: {0:?}")]
    InvalidAddress(String),
}

/// Errors returned by the Telegram Bot API client
#[derive(Error, Debug)]
pub enum TelegramError {
    /// Transport failure or undecodable response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Flood control: the server asks us to wait before retrying
    #[error("Flood control exceeded, retry after {retry_after}s: {description}")]
    RetryAfter {
        /// Seconds to wait, as signalled by the server
        retry_after: u64,
        /// Server description
        description: String,
    },

    /// Any other `ok: false` response
    #[error("Bot API error {code}: {description}")]
    Api {
        /// `error_code` from the response
        code: i64,
        /// `description` from the response
        description: String,
    },

    /// `ok: true` without a `result`, or similar protocol violations
    #[error("Invalid Bot API response: {0}")]
    InvalidResponse(String),
}

impl TelegramError {
    /// The server-requested backoff, if this is a flood-control error.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            TelegramError::RetryAfter { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Webhook registration failures (all fatal to startup)
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Registration was attempted without a usable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The platform rejected the call with a non-retryable error
    #[error("platform rejected setWebhook: {0}")]
    Platform(#[source] TelegramError),

    /// A retry cap was configured and flood control outlasted it
    #[error("gave up after {attempts} rate-limited attempts")]
    RetryBudgetExceeded {
        /// Attempts made before giving up
        attempts: u32,
    },
}

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for Bot API calls
pub type TelegramResult<T> = std::result::Result<T, TelegramError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::Config(ConfigError::MissingVar("WEBHOOK_URL"));
        assert!(err.to_string().contains("WEBHOOK_URL"));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn test_retry_after_accessor() {
        let err = TelegramError::RetryAfter {
            retry_after: 7,
            description: "Too Many Requests: retry after 7".to_string(),
        };
        assert_eq!(err.retry_after(), Some(7));

        let err = TelegramError::Api {
            code: 400,
            description: "Bad Request: bad webhook".to_string(),
        };
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_registration_error_wraps_config() {
        let err: RegistrationError = ConfigError::MissingWebhookUrl.into();
        assert_eq!(err.to_string(), "webhook URL is not configured");
    }

    #[test]
    fn test_api_error_display() {
        let err = TelegramError::Api {
            code: 401,
            description: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "Bot API error 401: Unauthorized");
    }
}
