//! Scrape-request queue.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SeshuJob;

/// Durable message stream that scrape workers consume.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Publish one scrape request for `job`.
    async fn publish(&self, job: &SeshuJob) -> Result<()>;

    /// Read the oldest unconsumed request without consuming it.
    async fn peek_head(&self) -> Result<Option<SeshuJob>>;
}
