//! Downstream update processing

use serde_json::Value;

/// Consumer of authenticated, decoded updates.
///
/// Errors returned here are logged by the endpoint and never change the
/// HTTP response: the platform only needs to know the update arrived.
#[async_trait::async_trait]
pub trait UpdateProcessor: Send + Sync + 'static {
    /// Handle one update payload exactly as it was delivered
    async fn process(&self, update: Value) -> anyhow::Result<()>;
}

/// Logs and drops every update
#[derive(Debug, Clone, Default)]
pub struct LoggingProcessor;

#[async_trait::async_trait]
impl UpdateProcessor for LoggingProcessor {
    async fn process(&self, update: Value) -> anyhow::Result<()> {
        tracing::info!(
            update_id = ?update.get("update_id"),
            "Update received"
        );
        Ok(())
    }
}
