//! Shared doubles for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use tg_echo_webhook::error::{TelegramError, TelegramResult};
use tg_echo_webhook::handlers::AppState;
use tg_echo_webhook::server::build_router;
use tg_echo_webhook::telegram::{BotApi, BotCommand, Chat, Message};
use tg_echo_webhook::UpdateProcessor;

pub const SECRET: &str = "integration-secret_42";
pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Bot API double that replays scripted `setWebhook` outcomes
#[derive(Default)]
pub struct ScriptedApi {
    script: Mutex<VecDeque<TelegramResult<bool>>>,
    pub calls: Mutex<Vec<(String, String, tokio::time::Instant)>>,
    pub sent: Mutex<Vec<(i64, String)>>,
}

impl ScriptedApi {
    pub fn new(script: Vec<TelegramResult<bool>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

pub fn flood(retry_after: u64) -> TelegramResult<bool> {
    Err(TelegramError::RetryAfter {
        retry_after,
        description: format!("Too Many Requests: retry after {retry_after}"),
    })
}

#[async_trait::async_trait]
impl BotApi for ScriptedApi {
    async fn set_webhook(&self, url: &str, secret_token: &str) -> TelegramResult<bool> {
        self.calls.lock().push((
            url.to_string(),
            secret_token.to_string(),
            tokio::time::Instant::now(),
        ));
        self.script.lock().pop_front().unwrap_or(Ok(true))
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        _reply_to_message_id: Option<i64>,
    ) -> TelegramResult<Message> {
        self.sent.lock().push((chat_id, text.to_string()));
        Ok(Message {
            message_id: 1,
            date: 0,
            chat: Chat { id: chat_id, kind: None },
            from: None,
            text: Some(text.to_string()),
        })
    }

    async fn set_my_commands(&self, _commands: &[BotCommand]) -> TelegramResult<bool> {
        Ok(true)
    }
}

/// How a [`RecordingProcessor`] behaves
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
    /// Sleep before succeeding
    Slow(Duration),
}

/// Processor that records every payload it receives
pub struct RecordingProcessor {
    pub received: Mutex<Vec<Value>>,
    pub calls: AtomicU32,
    behavior: Behavior,
}

impl RecordingProcessor {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
            behavior,
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl UpdateProcessor for RecordingProcessor {
    async fn process(&self, update: Value) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(update);
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => anyhow::bail!("simulated network failure while sending reply"),
            Behavior::Panic => panic!("processor blew up"),
            Behavior::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

pub fn app(processor: Arc<RecordingProcessor>) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new());
    (build_router(SECRET, processor, state.clone()), state)
}

pub fn webhook_request(secret: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header(SECRET_HEADER, secret);
    }
    builder.body(body.into()).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}
