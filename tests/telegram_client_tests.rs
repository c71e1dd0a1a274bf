//! Bot API client tests against a local fake Bot API server

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use url::Url;

use tg_echo_webhook::error::TelegramError;
use tg_echo_webhook::telegram::{BotApi, BotCommand, TelegramClient};

const TOKEN: &str = "123456:test-token";

#[derive(Default)]
struct FakeApi {
    /// (path, request body) of every call
    requests: Mutex<Vec<(String, Value)>>,
    response: Mutex<Option<(StatusCode, Value)>>,
}

async fn fake_method(
    State(fake): State<Arc<FakeApi>>,
    Path(path): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.requests.lock().push((path, body));
    let (status, payload) = fake
        .response
        .lock()
        .clone()
        .unwrap_or((StatusCode::OK, json!({"ok": true, "result": true})));
    (status, Json(payload))
}

/// Start a fake Bot API and return a client pointed at it
async fn start_fake(response: Option<(StatusCode, Value)>) -> (TelegramClient, Arc<FakeApi>) {
    let fake = Arc::new(FakeApi::default());
    *fake.response.lock() = response;

    let app = Router::new()
        .route("/*path", post(fake_method))
        .with_state(Arc::clone(&fake));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base = Url::parse(&format!("http://{addr}")).unwrap();
    (TelegramClient::new(TOKEN, base).unwrap(), fake)
}

#[tokio::test]
async fn test_set_webhook_success() {
    let (client, fake) = start_fake(None).await;

    let ok = client
        .set_webhook("https://bot.example.com/webhook", "s3cret")
        .await
        .unwrap();
    assert!(ok);

    let requests = fake.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, format!("bot{TOKEN}/setWebhook"));
    assert_eq!(
        requests[0].1,
        json!({"url": "https://bot.example.com/webhook", "secret_token": "s3cret"})
    );
}

#[tokio::test]
async fn test_flood_control_maps_to_retry_after() {
    let (client, _) = start_fake(Some((
        StatusCode::TOO_MANY_REQUESTS,
        json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 5",
            "parameters": {"retry_after": 5}
        }),
    )))
    .await;

    let err = client
        .set_webhook("https://bot.example.com/webhook", "s3cret")
        .await
        .unwrap_err();

    assert_eq!(err.retry_after(), Some(5));
    assert!(matches!(err, TelegramError::RetryAfter { retry_after: 5, .. }));
}

#[tokio::test]
async fn test_api_error_is_not_retryable() {
    let (client, _) = start_fake(Some((
        StatusCode::BAD_REQUEST,
        json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: bad webhook: HTTPS url must be provided for webhook"
        }),
    )))
    .await;

    let err = client
        .set_webhook("http://insecure.example/webhook", "s3cret")
        .await
        .unwrap_err();

    assert_eq!(err.retry_after(), None);
    match err {
        TelegramError::Api { code, description } => {
            assert_eq!(code, 400);
            assert!(description.contains("HTTPS url must be provided"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_reply_is_http_error() {
    let app = Router::new().route("/*path", post(|| async { "gateway exploded" }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client =
        TelegramClient::new(TOKEN, Url::parse(&format!("http://{addr}")).unwrap()).unwrap();
    let err = client.set_my_commands(&[]).await.unwrap_err();

    assert!(matches!(err, TelegramError::Http(_)));
    assert!(!err.to_string().contains(TOKEN));
}

#[tokio::test]
async fn test_send_message_payload() {
    let (client, fake) = start_fake(Some((
        StatusCode::OK,
        json!({
            "ok": true,
            "result": {
                "message_id": 99,
                "date": 1700000001,
                "chat": {"id": 42, "type": "private"},
                "text": "hello"
            }
        }),
    )))
    .await;

    let sent = client.send_message(42, "hello", Some(7)).await.unwrap();
    assert_eq!(sent.message_id, 99);
    assert_eq!(sent.chat.id, 42);

    client.send_message(42, "again", None).await.unwrap();

    let requests = fake.requests.lock();
    assert_eq!(requests[0].0, format!("bot{TOKEN}/sendMessage"));
    assert_eq!(
        requests[0].1,
        json!({"chat_id": 42, "text": "hello", "reply_to_message_id": 7})
    );
    assert_eq!(requests[1].1, json!({"chat_id": 42, "text": "again"}));
}

#[tokio::test]
async fn test_set_my_commands_payload() {
    let (client, fake) = start_fake(None).await;

    client
        .set_my_commands(&[BotCommand::new("start", "Start the bot")])
        .await
        .unwrap();

    let requests = fake.requests.lock();
    assert_eq!(requests[0].0, format!("bot{TOKEN}/setMyCommands"));
    assert_eq!(
        requests[0].1,
        json!({"commands": [{"command": "start", "description": "Start the bot"}]})
    );
}

#[tokio::test]
async fn test_unreachable_api_is_http_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        TelegramClient::new(TOKEN, Url::parse(&format!("http://{addr}")).unwrap()).unwrap();
    let err = client.set_webhook("https://x/webhook", "s").await.unwrap_err();

    assert!(matches!(err, TelegramError::Http(_)));
}
