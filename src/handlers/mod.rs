//! HTTP handlers that sit beside the webhook route.

pub mod status;

pub use status::{status_router, AppState, HealthResponse, StatusResponse, UpdateCounters};
