//! Storage traits for sessions and jobs.
//!
//! - `SessionStore`: draft scrape sessions keyed by source URL, with TTL
//! - `JobStore`: recurring jobs keyed by (normalized URL, owner)

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{SeshuJob, SeshuSession};

/// Persistence for scrape sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get a live session by URL. Expired sessions read as absent.
    async fn get(&self, url: &str) -> Result<Option<SeshuSession>>;

    /// Insert or replace the session stored under `session.url`.
    async fn insert(&self, session: &SeshuSession) -> Result<()>;

    /// Replace an existing session. Fails with `NotFound` if it is gone.
    async fn update(&self, session: &SeshuSession) -> Result<()>;

    /// Remove sessions whose `expire_at` is at or before `now`.
    ///
    /// Returns the number of sessions removed.
    async fn purge_expired(&self, now: i64) -> Result<usize>;
}

/// Persistence for recurring scrape jobs.
///
/// `create` must reject a duplicate `(normalized_url_key, owner_id)` with
/// `SeshuError::Conflict`, atomically with the insert.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// List jobs, optionally for one owner, ordered by creation time.
    async fn list(&self, owner_id: Option<&str>, limit: i64, offset: i64) -> Result<Vec<SeshuJob>>;

    async fn get(&self, normalized_url_key: &str, owner_id: &str) -> Result<Option<SeshuJob>>;

    async fn create(&self, job: &SeshuJob) -> Result<()>;

    /// Replace an existing job. Fails with `NotFound` if it is gone.
    async fn update(&self, job: &SeshuJob) -> Result<()>;

    /// Delete a job. Fails with `NotFound` if it is gone.
    async fn delete(&self, normalized_url_key: &str, owner_id: &str) -> Result<()>;

    /// Jobs whose scheduled hour falls in `[now_hour, now_hour + hours)` mod 24.
    async fn scan_due_within(&self, now_hour: u32, hours: u32) -> Result<Vec<SeshuJob>>;
}
