//! tg-echo webhook server
//!
//! Loads `.env`, reads configuration from the environment, registers the
//! webhook and serves deliveries until SIGINT/SIGTERM.

use std::net::IpAddr;

use anyhow::Context;
use clap::Parser;
use tg_echo_webhook::{server, BotConfig};

/// Telegram echo bot served over a webhook
#[derive(Parser, Debug)]
#[command(name = "tg-echo")]
#[command(version)]
#[command(about = "Webhook-driven Telegram echo bot")]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind to (overrides LISTEN_ADDR)
    #[arg(short = 'H', long)]
    host: Option<IpAddr>,

    /// Public webhook URL (overrides WEBHOOK_URL)
    #[arg(long)]
    webhook_url: Option<String>,

    /// Give up webhook registration after this many rate-limited attempts
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut config = match args.webhook_url {
        Some(url) => BotConfig::from_lookup(|key| {
            if key == "WEBHOOK_URL" {
                Some(url.clone())
            } else {
                std::env::var(key).ok()
            }
        }),
        None => BotConfig::from_env(),
    }
    .context("invalid configuration")?;

    if let Some(port) = args.port {
        config.webhook.port = port;
    }
    if let Some(host) = args.host {
        config.webhook.listen_address = host;
    }
    if args.max_attempts.is_some() {
        config.max_registration_attempts = args.max_attempts;
    }

    tracing::info!(
        version = tg_echo_webhook::VERSION,
        addr = %config.socket_addr(),
        webhook_url = %config.webhook.url,
        "Starting tg-echo"
    );

    server::run(config, server::shutdown_signal())
        .await
        .context("bot terminated")?;

    tracing::info!("tg-echo stopped");
    Ok(())
}
