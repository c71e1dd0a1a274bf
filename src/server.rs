//! Process wiring: registration, listener and graceful shutdown.
//!
//! ```text
//! BotConfig ──> TelegramClient ──> WebhookRegistrar::register ──(fatal)──> exit
//!                     │                     │
//!                     │                     ▼ ok
//!                     └──> EchoBot ──> WebhookEndpoint ──> axum::serve ──(signal)──> drain ──> exit
//! ```
//!
//! Registration completes before the listener is bound, so the process is
//! never reachable with an unregistered webhook.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::bot::EchoBot;
use crate::config::BotConfig;
use crate::error::Result;
use crate::handlers::{status_router, AppState};
use crate::registrar::WebhookRegistrar;
use crate::telegram::TelegramClient;
use crate::webhook::{webhook_router, UpdateProcessor, WebhookEndpoint};

/// Build the full HTTP surface: `/`, `/health`, `/status` and `POST /webhook`.
pub fn build_router(
    secret_token: &str,
    processor: Arc<dyn UpdateProcessor>,
    state: Arc<AppState>,
) -> Router {
    let endpoint = Arc::new(WebhookEndpoint::new(
        secret_token,
        processor,
        Arc::clone(&state),
    ));

    Router::new()
        .merge(status_router(state))
        .merge(webhook_router(endpoint))
        .layer(TraceLayer::new_for_http())
}

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// After the signal no new connections are accepted; in-flight requests
/// get up to `drain_timeout` to finish before the server task is aborted.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    drain_timeout: Duration,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => {
            // Listener failed before any shutdown signal
            return joined.map_err(std::io::Error::other)?.map_err(Into::into);
        }
        () = shutdown => {
            info!(
                drain_secs = drain_timeout.as_secs_f64(),
                "Shutdown requested, draining in-flight requests"
            );
        }
    }

    let _ = stop_tx.send(());

    match tokio::time::timeout(drain_timeout, &mut server).await {
        Ok(joined) => {
            joined.map_err(std::io::Error::other)??;
            info!("HTTP server stopped gracefully");
        }
        Err(_) => {
            warn!("Drain timeout elapsed, aborting remaining requests");
            server.abort();
        }
    }

    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

/// Register the webhook, then serve until `shutdown` resolves.
///
/// The binary passes [`shutdown_signal`].
///
/// # Errors
///
/// Returns configuration and fatal registration errors before binding, and
/// I/O errors from the listener.
pub async fn run<F>(config: BotConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let api = Arc::new(TelegramClient::new(
        config.bot_token.clone(),
        config.api_url.clone(),
    )?);

    WebhookRegistrar::new(Arc::clone(&api))
        .with_max_attempts(config.max_registration_attempts)
        .register(&config.webhook)
        .await?;

    let bot = EchoBot::new(Arc::clone(&api));
    bot.register_commands().await;

    let state = Arc::new(AppState::new());
    let app = build_router(&config.webhook.secret_token, Arc::new(bot), state);

    let addr: SocketAddr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Webhook listener ready");

    serve(listener, app, shutdown, config.shutdown_timeout).await
}
