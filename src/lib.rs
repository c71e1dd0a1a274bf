//! tg-echo-webhook - Webhook-driven Telegram echo bot
//!
//! Registers its public URL with the Telegram Bot API (riding out flood
//! control), then serves update deliveries over HTTP: each delivery is
//! authenticated by the shared secret header, decoded and handed to the
//! echo bot, which greets on `/start` and echoes any other text.
//!
//! # Architecture
//!
//! ```text
//!                 setWebhook (retry_after backoff)
//! WebhookRegistrar ─────────────────────────────▶ Bot API
//!                                                   │
//!                    POST /webhook                  │ deliveries
//! WebhookEndpoint ◀─────────────────────────────────┘
//!   │  secret check ─▶ 403
//!   │  JSON decode  ─▶ 500
//!   ▼
//! EchoBot (UpdateProcessor) ── sendMessage ──▶ Bot API
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tg_echo_webhook::{server, BotConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BotConfig::from_env()?;
//!     server::run(config, server::shutdown_signal()).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod registrar;
pub mod security;
pub mod server;
pub mod telegram;
pub mod webhook;

// Re-exports for convenience
pub use bot::EchoBot;
pub use config::{BotConfig, WebhookConfig};
pub use error::{Error, Result};
pub use registrar::{normalize_webhook_url, RegistrationAttempt, WebhookRegistrar};
pub use telegram::{BotApi, TelegramClient};
pub use webhook::{HandlerResult, InboundRequest, UpdateProcessor, WebhookEndpoint};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
