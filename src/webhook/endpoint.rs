//! Inbound webhook handling
//!
//! ```text
//! POST /webhook
//!       |
//!       v
//! [Verify secret header] --mismatch/missing--> 403 (body never read)
//!       |
//!       v
//! [Read body, MAX_UPDATE_BYTES] --too large--> 500
//!       |
//!       v
//! [Decode JSON body] --------invalid----------> 500
//!       |
//!       v
//! [UpdateProcessor::process] --error/panic--> logged
//!       |
//!       v
//!      200
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::config::WEBHOOK_PATH;
use crate::handlers::AppState;
use crate::security::{SecretTokenVerifier, SECRET_TOKEN_HEADER};
use crate::webhook::processor::UpdateProcessor;

/// Largest update body read after authentication (2 MiB)
pub const MAX_UPDATE_BYTES: usize = 2 * 1024 * 1024;

/// A single webhook delivery as received over HTTP
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// Request headers
    pub headers: HeaderMap,
    /// Undecoded request body
    pub raw_body: Bytes,
}

impl InboundRequest {
    /// Build a request from its parts
    pub fn new(headers: HeaderMap, raw_body: impl Into<Bytes>) -> Self {
        Self {
            headers,
            raw_body: raw_body.into(),
        }
    }

    /// Value of the secret token header, if present and valid UTF-8
    pub fn supplied_secret(&self) -> Option<&str> {
        self.headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
    }

    /// Decode the body as JSON
    pub fn parsed_update(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.raw_body)
    }
}

/// Outcome of handling a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResult {
    /// Authenticated and decoded; processing outcome is irrelevant
    Accepted,
    /// Refused before the body was read
    Rejected(&'static str),
    /// Body could not be decoded
    InternalError,
}

impl HandlerResult {
    /// HTTP status for this outcome
    pub fn status_code(&self) -> StatusCode {
        match self {
            HandlerResult::Accepted => StatusCode::OK,
            HandlerResult::Rejected(_) => StatusCode::FORBIDDEN,
            HandlerResult::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerResult {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            HandlerResult::Accepted => status.into_response(),
            HandlerResult::Rejected(reason) => (status, reason).into_response(),
            HandlerResult::InternalError => (status, "internal error").into_response(),
        }
    }
}

/// Authenticates deliveries and hands them to an [`UpdateProcessor`].
///
/// Holds only read-only configuration plus atomic counters, so any number
/// of requests can be handled concurrently.
pub struct WebhookEndpoint {
    verifier: SecretTokenVerifier,
    processor: Arc<dyn UpdateProcessor>,
    state: Arc<AppState>,
}

impl WebhookEndpoint {
    /// Create an endpoint expecting `secret_token` on every delivery
    pub fn new(
        secret_token: impl Into<String>,
        processor: Arc<dyn UpdateProcessor>,
        state: Arc<AppState>,
    ) -> Self {
        Self {
            verifier: SecretTokenVerifier::new(secret_token),
            processor,
            state,
        }
    }

    /// Handle one fully buffered delivery.
    ///
    /// Processor failures, including panics, are logged and still yield
    /// `Accepted`.
    pub async fn handle(&self, request: InboundRequest) -> HandlerResult {
        self.handle_body(request.headers, Body::from(request.raw_body))
            .await
    }

    /// Handle a delivery whose body has not been read yet.
    ///
    /// The secret header is checked before any body bytes are consumed, so
    /// an unauthenticated request is refused whatever its size. An
    /// authenticated body larger than [`MAX_UPDATE_BYTES`] counts as
    /// malformed.
    pub async fn handle_body(&self, headers: HeaderMap, body: Body) -> HandlerResult {
        let started = Instant::now();

        let result = match self.authenticate(&headers) {
            Err(rejected) => rejected,
            Ok(()) => match axum::body::to_bytes(body, MAX_UPDATE_BYTES).await {
                Ok(raw_body) => self.admit(InboundRequest::new(headers, raw_body)).await,
                Err(e) => {
                    self.state.record_malformed();
                    warn!(error = %e, "Could not read update body");
                    HandlerResult::InternalError
                }
            },
        };

        self.state.record_latency(started.elapsed());
        result
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<(), HandlerResult> {
        let auth = self.verifier.authenticate(headers);
        if auth.is_ok() {
            return Ok(());
        }
        self.state.record_rejected();
        debug!(?auth, "Rejected webhook delivery");
        Err(HandlerResult::Rejected("forbidden"))
    }

    async fn admit(&self, request: InboundRequest) -> HandlerResult {
        let update = match request.parsed_update() {
            Ok(update) => update,
            Err(e) => {
                self.state.record_malformed();
                warn!(error = %e, body_len = request.raw_body.len(), "Malformed update payload");
                return HandlerResult::InternalError;
            }
        };

        let update_id = update.get("update_id").and_then(Value::as_i64);

        let outcome = AssertUnwindSafe(self.processor.process(update))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                debug!(?update_id, "Update processed");
            }
            Ok(Err(e)) => {
                self.state.record_processing_error();
                let reason = format!("{e:#}");
                error!(?update_id, error = %reason, "Update processing failed");
            }
            Err(panic) => {
                self.state.record_processing_error();
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(?update_id, panic = %message, "Update processor panicked");
            }
        }

        self.state.record_accepted();
        HandlerResult::Accepted
    }
}

/// `POST /webhook`
///
/// Takes the raw request so the body stays unread until the secret header
/// has been checked.
#[instrument(skip_all)]
pub async fn webhook_handler(
    State(endpoint): State<Arc<WebhookEndpoint>>,
    request: Request,
) -> HandlerResult {
    let (parts, body) = request.into_parts();
    endpoint.handle_body(parts.headers, body).await
}

/// Router exposing `POST /webhook`
pub fn webhook_router<S>(endpoint: Arc<WebhookEndpoint>) -> axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    axum::Router::new()
        .route(WEBHOOK_PATH, axum::routing::post(webhook_handler))
        .with_state(endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProcessor {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl UpdateProcessor for CountingProcessor {
        async fn process(&self, _update: Value) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("simulated network failure");
            }
            Ok(())
        }
    }

    fn endpoint(fail: bool) -> (WebhookEndpoint, Arc<CountingProcessor>, Arc<AppState>) {
        let processor = Arc::new(CountingProcessor {
            calls: AtomicU32::new(0),
            fail,
        });
        let state = Arc::new(AppState::new());
        let endpoint = WebhookEndpoint::new("s3cret", processor.clone(), state.clone());
        (endpoint, processor, state)
    }

    fn signed(body: &'static str) -> InboundRequest {
        let mut headers = HeaderMap::new();
        headers.insert("x-telegram-bot-api-secret-token", "s3cret".parse().unwrap());
        InboundRequest::new(headers, body)
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(HandlerResult::Accepted.status_code(), StatusCode::OK);
        assert_eq!(
            HandlerResult::Rejected("forbidden").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            HandlerResult::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_missing_secret_skips_parsing() {
        let (endpoint, processor, state) = endpoint(false);

        // Body is not JSON; a 403 proves it was never decoded
        let result = endpoint
            .handle(InboundRequest::new(HeaderMap::new(), "not-json"))
            .await;

        assert_eq!(result, HandlerResult::Rejected("forbidden"));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.counters().malformed, 0);
        assert_eq!(state.counters().rejected, 1);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (endpoint, processor, state) = endpoint(false);

        let result = endpoint.handle(signed("not-json")).await;

        assert_eq!(result, HandlerResult::InternalError);
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.counters().malformed, 1);
    }

    #[tokio::test]
    async fn test_processor_failure_still_accepted() {
        let (endpoint, processor, state) = endpoint(true);

        let result = endpoint.handle(signed(r#"{"update_id": 1}"#)).await;

        assert_eq!(result, HandlerResult::Accepted);
        assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.counters().processing_errors, 1);
        assert_eq!(state.counters().accepted, 1);
    }

    #[test]
    fn test_inbound_request_accessors() {
        let request = signed(r#"{"update_id": 9}"#);
        assert_eq!(request.supplied_secret(), Some("s3cret"));
        assert_eq!(request.parsed_update().unwrap()["update_id"], 9);
        assert_eq!(InboundRequest::default().supplied_secret(), None);
    }

    #[tokio::test]
    async fn test_oversized_body_without_secret_is_rejected() {
        let (endpoint, processor, state) = endpoint(false);
        let body = Body::from(vec![b'x'; MAX_UPDATE_BYTES * 2]);

        let result = endpoint.handle_body(HeaderMap::new(), body).await;

        assert_eq!(result, HandlerResult::Rejected("forbidden"));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.counters().rejected, 1);
        assert_eq!(state.counters().malformed, 0);
    }

    #[tokio::test]
    async fn test_oversized_body_with_secret_is_malformed() {
        let (endpoint, processor, state) = endpoint(false);
        let headers = signed("").headers;
        let body = Body::from(vec![b' '; MAX_UPDATE_BYTES + 1]);

        let result = endpoint.handle_body(headers, body).await;

        assert_eq!(result, HandlerResult::InternalError);
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.counters().malformed, 1);
    }
}
