//! Dispatcher watermark persistence.

use async_trait::async_trait;

use crate::error::Result;

/// Persists the unix timestamp of the last successful dispatcher scan.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// `None` when the dispatcher has never completed a scan.
    async fn load(&self) -> Result<Option<i64>>;

    async fn store(&self, timestamp: i64) -> Result<()>;
}
