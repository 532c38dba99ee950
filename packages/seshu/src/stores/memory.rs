//! In-memory storage implementations for testing and development.
//!
//! Data is lost on restart. The job store enforces the dedup key under its
//! write lock, so concurrent creates behave like a unique constraint.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, SeshuError};
use crate::traits::{
    store::{JobStore, SessionStore},
    watermark::WatermarkStore,
};
use crate::types::{SeshuJob, SeshuSession, SessionStatus};

/// In-memory session store.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SeshuSession>>,
    writes: RwLock<usize>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a session regardless of expiry.
    pub fn get_raw(&self, url: &str) -> Option<SeshuSession> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of successful insert/update calls.
    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn record_write(&self) {
        *self.writes.write().unwrap_or_else(|e| e.into_inner()) += 1;
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, url: &str) -> Result<Option<SeshuSession>> {
        let now = Utc::now().timestamp();
        Ok(self.get_raw(url).filter(|s| !s.is_expired(now)))
    }

    async fn insert(&self, session: &SeshuSession) -> Result<()> {
        {
            let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = sessions.get(&session.url) {
                guard_status(existing, session)?;
            }
            sessions.insert(session.url.clone(), session.clone());
        }
        self.record_write();
        Ok(())
    }

    async fn update(&self, session: &SeshuSession) -> Result<()> {
        {
            let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
            let existing = sessions
                .get_mut(&session.url)
                .ok_or_else(|| SeshuError::not_found(format!("session for {}", session.url)))?;
            guard_status(existing, session)?;
            *existing = session.clone();
        }
        self.record_write();
        Ok(())
    }

    async fn purge_expired(&self, now: i64) -> Result<usize> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - sessions.len())
    }
}

// A submitted session never goes back to draft.
fn guard_status(existing: &SeshuSession, next: &SeshuSession) -> Result<()> {
    if existing.status == SessionStatus::Submitted && next.status == SessionStatus::Draft {
        return Err(SeshuError::conflict(existing.url.clone()));
    }
    Ok(())
}

/// In-memory job store keyed by `(normalized_url_key, owner_id)`.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<(String, String), SeshuJob>>,
    writes: RwLock<usize>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of successful create/update/delete calls.
    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn record_write(&self) {
        *self.writes.write().unwrap_or_else(|e| e.into_inner()) += 1;
    }

    fn key(job: &SeshuJob) -> (String, String) {
        (job.normalized_url_key.clone(), job.owner_id.clone())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn list(&self, owner_id: Option<&str>, limit: i64, offset: i64) -> Result<Vec<SeshuJob>> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        let mut matching: Vec<SeshuJob> = jobs
            .values()
            .filter(|j| owner_id.map_or(true, |o| j.owner_id == o))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.normalized_url_key.cmp(&b.normalized_url_key))
        });
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get(&self, normalized_url_key: &str, owner_id: &str) -> Result<Option<SeshuJob>> {
        Ok(self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(normalized_url_key.to_string(), owner_id.to_string()))
            .cloned())
    }

    async fn create(&self, job: &SeshuJob) -> Result<()> {
        {
            let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
            let key = Self::key(job);
            if jobs.contains_key(&key) {
                return Err(SeshuError::conflict(job.normalized_url_key.clone()));
            }
            jobs.insert(key, job.clone());
        }
        self.record_write();
        Ok(())
    }

    async fn update(&self, job: &SeshuJob) -> Result<()> {
        {
            let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
            let existing = jobs
                .get_mut(&Self::key(job))
                .ok_or_else(|| SeshuError::not_found(format!("job for {}", job.normalized_url_key)))?;
            *existing = job.clone();
        }
        self.record_write();
        Ok(())
    }

    async fn delete(&self, normalized_url_key: &str, owner_id: &str) -> Result<()> {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(normalized_url_key.to_string(), owner_id.to_string()))
            .ok_or_else(|| SeshuError::not_found(format!("job for {}", normalized_url_key)))?;
        self.record_write();
        Ok(())
    }

    async fn scan_due_within(&self, now_hour: u32, hours: u32) -> Result<Vec<SeshuJob>> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        let mut due: Vec<SeshuJob> = jobs
            .values()
            .filter(|j| j.is_due_within(now_hour, hours))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.normalized_url_key.cmp(&b.normalized_url_key));
        Ok(due)
    }
}

/// In-memory dispatcher watermark.
#[derive(Default)]
pub struct MemoryWatermark {
    value: RwLock<Option<i64>>,
}

impl MemoryWatermark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(timestamp: i64) -> Self {
        Self {
            value: RwLock::new(Some(timestamp)),
        }
    }

    pub fn current(&self) -> Option<i64> {
        *self.value.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermark {
    async fn load(&self) -> Result<Option<i64>> {
        Ok(self.current())
    }

    async fn store(&self, timestamp: i64) -> Result<()> {
        *self.value.write().unwrap_or_else(|e| e.into_inner()) = Some(timestamp);
        Ok(())
    }
}
