//! Liveness, health and status handlers.
//!
//! | Route     | Body                                   |
//! |-----------|----------------------------------------|
//! | `/`       | [`LIVENESS_BODY`], no authentication   |
//! | `/health` | `{"status":"healthy"}`                 |
//! | `/status` | [`StatusResponse`] JSON                |
//!
//! The webhook endpoint writes into [`AppState`]; `/status` only reads a
//! snapshot of it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, instrument};

/// Crate version reported by `/status`
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name reported by `/status`
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Body returned by the liveness probe
pub const LIVENESS_BODY: &str = "Bot is running";

/// `/health` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"healthy"`; an unhealthy process does not answer at all
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Runtime status with webhook delivery counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Crate version
    pub version: String,
    /// Crate name
    pub name: String,
    /// Seconds since the listener started
    pub uptime_seconds: u64,

    /// Delivery outcome counters
    pub updates: UpdateCounters,
    /// Process memory
    pub memory: ProcessMemory,
    /// Time spent in `WebhookEndpoint::handle`
    pub latency: LatencyMetrics,
    /// RFC 3339 time the snapshot was taken
    pub timestamp: String,
}

/// Webhook delivery outcomes since startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCounters {
    /// Deliveries acknowledged with 200
    pub accepted: u64,
    /// Deliveries refused with 403
    pub rejected: u64,
    /// Deliveries with an undecodable body (500)
    pub malformed: u64,
    /// Accepted deliveries whose processing failed
    pub processing_errors: u64,
}

/// Memory of this process as reported by sysinfo
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessMemory {
    /// Resident bytes
    pub rss_bytes: u64,
    /// Virtual bytes
    pub virtual_bytes: u64,
}

/// Delivery handling time in milliseconds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    /// Median
    pub p50_ms: f64,
    /// 95th percentile
    pub p95_ms: f64,
    /// 99th percentile
    pub p99_ms: f64,
    /// Slowest delivery seen
    pub max_ms: f64,
}

/// Microsecond histogram of delivery handling time.
///
/// Tracks 1us up to [`MAX_TRACKED_MICROS`]; longer deliveries are clamped
/// to the upper bound so a stuck processor still shows up in `max_ms`.
#[derive(Debug)]
pub struct LatencyHistogram {
    inner: RwLock<Histogram<u64>>,
}

/// Upper bound of [`LatencyHistogram`] (two minutes)
pub const MAX_TRACKED_MICROS: u64 = 120_000_000;

impl LatencyHistogram {
    /// Empty histogram at 3 significant figures
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, MAX_TRACKED_MICROS, 3)
            .expect("static histogram bounds are valid");
        Self {
            inner: RwLock::new(histogram),
        }
    }

    /// Record one delivery
    pub fn record_duration(&self, duration: std::time::Duration) {
        let micros = u64::try_from(duration.as_micros())
            .unwrap_or(MAX_TRACKED_MICROS)
            .clamp(1, MAX_TRACKED_MICROS);
        self.inner.write().saturating_record(micros);
    }

    /// Number of recorded values
    pub fn count(&self) -> u64 {
        self.inner.read().len()
    }

    /// Snapshot in milliseconds
    pub fn metrics(&self) -> LatencyMetrics {
        let hist = self.inner.read();
        let ms = |micros: u64| micros as f64 / 1000.0;
        LatencyMetrics {
            p50_ms: ms(hist.value_at_quantile(0.50)),
            p95_ms: ms(hist.value_at_quantile(0.95)),
            p99_ms: ms(hist.value_at_quantile(0.99)),
            max_ms: ms(hist.max()),
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery counters shared by the webhook endpoint and the status handler.
///
/// Counters are atomics; the endpoint only ever increments them, so no
/// request observes another request's state.
#[derive(Debug)]
pub struct AppState {
    start_time: Instant,
    accepted: AtomicU64,
    rejected: AtomicU64,
    malformed: AtomicU64,
    processing_errors: AtomicU64,
    latency_histogram: LatencyHistogram,
}

impl AppState {
    /// Zeroed counters, uptime starting now
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            processing_errors: AtomicU64::new(0),
            latency_histogram: LatencyHistogram::new(),
        }
    }

    /// Seconds since [`AppState::new`]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Count a 200 acknowledgement.
    #[inline]
    pub fn record_accepted(&self) -> u64 {
        self.accepted.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a 403.
    #[inline]
    pub fn record_rejected(&self) -> u64 {
        self.rejected.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count an undecodable body.
    #[inline]
    pub fn record_malformed(&self) -> u64 {
        self.malformed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a downstream processing failure.
    #[inline]
    pub fn record_processing_error(&self) -> u64 {
        self.processing_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record how long a delivery took to handle
    pub fn record_latency(&self, duration: std::time::Duration) {
        self.latency_histogram.record_duration(duration);
    }

    /// Snapshot of the delivery counters
    pub fn counters(&self) -> UpdateCounters {
        UpdateCounters {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            processing_errors: self.processing_errors.load(Ordering::Relaxed),
        }
    }

    /// Latency percentiles so far
    pub fn latency_metrics(&self) -> LatencyMetrics {
        self.latency_histogram.metrics()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Memory of this process, zeroed when sysinfo cannot see it
fn process_memory() -> ProcessMemory {
    let pid = Pid::from_u32(std::process::id());
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    system
        .process(pid)
        .map(|process| ProcessMemory {
            rss_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        })
        .unwrap_or_else(|| {
            debug!(pid = pid.as_u32(), "Process not visible to sysinfo");
            ProcessMemory::default()
        })
}

/// Liveness probe.
///
/// # Route
/// `GET /`
///
/// Always `200 OK` with a static body, regardless of headers.
pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, LIVENESS_BODY)
}

/// `GET /health`, answers `{"status":"healthy"}`
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// `GET /status`, delivery counters and process metrics.
///
/// ```bash
/// curl http://localhost:8443/status
/// # {
/// #   "version": "0.1.0",
/// #   "name": "tg-echo-webhook",
/// #   "uptime_seconds": 3600,
/// #   "updates": {"accepted": 120, "rejected": 2, "malformed": 0, "processing_errors": 1},
/// #   "memory": {"rss_bytes": 12582912, "virtual_bytes": 268435456},
/// #   "latency": {"p50_ms": 41.2, "p95_ms": 95.1, "p99_ms": 180.7, "max_ms": 301.0},
/// #   "timestamp": "2026-01-01T12:00:00Z"
/// # }
/// ```
#[instrument(skip_all)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = StatusResponse {
        version: SERVER_VERSION.to_string(),
        name: SERVER_NAME.to_string(),
        uptime_seconds: state.uptime_seconds(),
        updates: state.counters(),
        memory: process_memory(),
        latency: state.latency_metrics(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}

/// Router with `/`, `/health` and `/status`.
///
/// The returned router already carries its state and can be merged into a
/// router of any state type.
pub fn status_router<S>(state: Arc<AppState>) -> axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    use axum::routing::get;

    axum::Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}
