//! Model-backed event extraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EventCandidate, ScrapeMode};

/// Turns raw HTML into event candidates.
///
/// Leading or trailing noise around the model's JSON is tolerated; JSON
/// that is truncated or structurally invalid is an upstream error and is
/// never retried here.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, html: &str, mode: ScrapeMode) -> Result<Vec<EventCandidate>>;
}
