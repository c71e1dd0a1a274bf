//! Startup configuration
//!
//! Everything is read once from the environment (after `.env` has been
//! loaded by `main`) into an immutable [`BotConfig`] that is then passed
//! explicitly to the registrar, the bot and the HTTP server.
//!
//! # Environment Variables
//!
//! - `TELEGRAM_BOT_TOKEN` (required): Bot API credential
//! - `WEBHOOK_URL` (required): public base URL; `/webhook` is appended if missing
//! - `SECRET_TOKEN` (required): shared secret checked on every callback
//! - `PORT` (optional): listen port (default: 8443)
//! - `LISTEN_ADDR` (optional): listen address (default: 0.0.0.0)
//! - `TELEGRAM_API_URL` (optional): Bot API base (default: <https://api.telegram.org>)
//! - `WEBHOOK_MAX_ATTEMPTS` (optional): cap on rate-limited registration attempts
//! - `SHUTDOWN_TIMEOUT_SECS` (optional): in-flight drain limit (default: 5)

use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Path segment the platform delivers updates to
pub const WEBHOOK_PATH: &str = "/webhook";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8443;

/// Default Bot API base URL
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Default drain time for in-flight requests on shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how the platform should deliver updates.
#[derive(Clone)]
pub struct WebhookConfig {
    /// Public webhook URL as configured (normalized at registration time)
    pub url: String,
    /// Shared secret expected in `X-Telegram-Bot-Api-Secret-Token`
    pub secret_token: String,
    /// Address the listener binds to
    pub listen_address: IpAddr,
    /// Port the listener binds to
    pub port: u16,
}

impl WebhookConfig {
    /// Socket address for binding the listener
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.port)
    }
}

// Secrets stay out of logs.
impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url)
            .field("secret_token", &"<redacted>")
            .field("listen_address", &self.listen_address)
            .field("port", &self.port)
            .finish()
    }
}

/// Complete process configuration.
#[derive(Clone)]
pub struct BotConfig {
    /// Bot API token
    pub bot_token: String,
    /// Bot API base URL
    pub api_url: Url,
    /// Webhook registration and listener settings
    pub webhook: WebhookConfig,
    /// Cap on registration attempts; `None` retries flood control forever
    pub max_registration_attempts: Option<u32>,
    /// How long in-flight requests may run after a shutdown signal
    pub shutdown_timeout: Duration,
}

impl BotConfig {
    /// Load configuration from process environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVar` if `TELEGRAM_BOT_TOKEN`, `WEBHOOK_URL`
    /// or `SECRET_TOKEN` is not set, and a validation error for malformed values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = required(&lookup, "TELEGRAM_BOT_TOKEN")?;

        let url = lookup("WEBHOOK_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingWebhookUrl)?;
        Url::parse(&url).map_err(|e| ConfigError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let secret_token = required(&lookup, "SECRET_TOKEN")?;
        validate_secret_token(&secret_token)?;

        let port = match lookup("PORT") {
            Some(raw) => parse_number::<u16>("PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let listen_address = match lookup("LISTEN_ADDR") {
            Some(raw) => raw
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidAddress(raw))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let api_raw = lookup("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&api_raw).map_err(|e| ConfigError::InvalidUrl {
            url: api_raw.clone(),
            reason: e.to_string(),
        })?;

        let max_registration_attempts = lookup("WEBHOOK_MAX_ATTEMPTS")
            .map(|raw| parse_number::<u32>("WEBHOOK_MAX_ATTEMPTS", &raw))
            .transpose()?;

        let shutdown_timeout = match lookup("SHUTDOWN_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number::<u64>("SHUTDOWN_TIMEOUT_SECS", &raw)?),
            None => DEFAULT_SHUTDOWN_TIMEOUT,
        };

        Ok(Self {
            bot_token,
            api_url,
            webhook: WebhookConfig {
                url,
                secret_token,
                listen_address,
                port,
            },
            max_registration_attempts,
            shutdown_timeout,
        })
    }

    /// Socket address for binding the listener
    pub fn socket_addr(&self) -> SocketAddr {
        self.webhook.socket_addr()
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &"<redacted>")
            .field("api_url", &self.api_url.as_str())
            .field("webhook", &self.webhook)
            .field("max_registration_attempts", &self.max_registration_attempts)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(var).ok_or(ConfigError::MissingVar(var))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::EmptyValue(var));
    }
    Ok(value.to_string())
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

/// Check a secret against the Bot API's accepted alphabet and length.
pub fn validate_secret_token(token: &str) -> Result<(), ConfigError> {
    if token.is_empty() || token.len() > 256 {
        return Err(ConfigError::InvalidSecretToken(format!(
            "length must be 1-256, got {}",
            token.len()
        )));
    }
    if let Some(bad) = token
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(ConfigError::InvalidSecretToken(format!(
            "character {bad:?} is not allowed"
        )));
    }
    Ok(())
}
