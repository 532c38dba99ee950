//! Testing utilities including mock implementations.
//!
//! These let applications exercise the pipeline without network calls, a
//! model, or a message broker. Stores are covered by the in-memory
//! implementations in [`crate::stores`].

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{Result, SeshuError};
use crate::stores::MemoryJobStore;
use crate::traits::{
    extractor::Extractor,
    queue::Queue,
    scraper::{FetchOptions, Scraper},
    store::JobStore,
};
use crate::types::{EventCandidate, ScrapeMode, SeshuJob};

/// A mock scraper that serves one canned page for every URL.
#[derive(Default)]
pub struct MockScraper {
    html: String,
    fail: bool,
    /// Call tracking
    calls: Arc<RwLock<Vec<(String, FetchOptions)>>>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page returned by every fetch.
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    /// Make every fetch fail with an upstream error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// URLs fetched so far, in call order.
    pub fn fetched_urls(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Options passed with each fetch.
    pub fn fetch_options(&self) -> Vec<FetchOptions> {
        self.calls
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, options)| options.clone())
            .collect()
    }
}

#[async_trait]
impl Scraper for MockScraper {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String> {
        self.calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((url.to_string(), options.clone()));

        if self.fail {
            return Err(SeshuError::upstream("scraper", "mock connection refused"));
        }
        Ok(self.html.clone())
    }
}

/// A mock extractor returning canned candidates.
#[derive(Default)]
pub struct MockExtractor {
    candidates: Vec<EventCandidate>,
    fail: bool,
    calls: Arc<RwLock<Vec<ScrapeMode>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(mut self, candidates: Vec<EventCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Make every call fail as if the model returned malformed JSON.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Modes the extractor was called with.
    pub fn modes(&self) -> Vec<ScrapeMode> {
        self.calls.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(&self, _html: &str, mode: ScrapeMode) -> Result<Vec<EventCandidate>> {
        self.calls
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(mode);

        if self.fail {
            return Err(SeshuError::upstream("extractor", "malformed model output"));
        }
        Ok(self.candidates.clone())
    }
}

/// Queue double that records every successful publish.
///
/// Published jobs stay at the head in publish order; nothing consumes them.
#[derive(Default)]
pub struct RecordingQueue {
    published: RwLock<Vec<SeshuJob>>,
    attempts: AtomicUsize,
    fail_on: Option<usize>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th publish attempt (1-based) and only that one.
    pub fn fail_on(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    pub fn published(&self) -> Vec<SeshuJob> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Queue for RecordingQueue {
    async fn publish(&self, job: &SeshuJob) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(attempt) {
            return Err(SeshuError::queue(format!("mock publish {} rejected", attempt)));
        }
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(job.clone());
        Ok(())
    }

    async fn peek_head(&self) -> Result<Option<SeshuJob>> {
        Ok(self
            .published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .first()
            .cloned())
    }
}

/// Job store wrapper whose scan or create can be made to fail.
///
/// Everything else is served by an inner [`MemoryJobStore`].
#[derive(Default)]
pub struct FailingJobStore {
    inner: MemoryJobStore,
    fail_scan: bool,
    fail_create: bool,
    conflict_on_create: bool,
}

impl FailingJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every scan fails with a store error.
    pub fn with_scan_failure(mut self) -> Self {
        self.fail_scan = true;
        self
    }

    /// Every create fails with a store error.
    pub fn with_create_failure(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Every create reports a unique-constraint conflict, as if another
    /// request inserted the same job first.
    pub fn with_create_conflict(mut self) -> Self {
        self.conflict_on_create = true;
        self
    }

    pub fn inner(&self) -> &MemoryJobStore {
        &self.inner
    }
}

#[async_trait]
impl JobStore for FailingJobStore {
    async fn list(&self, owner_id: Option<&str>, limit: i64, offset: i64) -> Result<Vec<SeshuJob>> {
        self.inner.list(owner_id, limit, offset).await
    }

    async fn get(&self, normalized_url_key: &str, owner_id: &str) -> Result<Option<SeshuJob>> {
        self.inner.get(normalized_url_key, owner_id).await
    }

    async fn create(&self, job: &SeshuJob) -> Result<()> {
        if self.conflict_on_create {
            return Err(SeshuError::conflict(job.normalized_url_key.clone()));
        }
        if self.fail_create {
            return Err(SeshuError::store("mock job store unavailable"));
        }
        self.inner.create(job).await
    }

    async fn update(&self, job: &SeshuJob) -> Result<()> {
        self.inner.update(job).await
    }

    async fn delete(&self, normalized_url_key: &str, owner_id: &str) -> Result<()> {
        self.inner.delete(normalized_url_key, owner_id).await
    }

    async fn scan_due_within(&self, now_hour: u32, hours: u32) -> Result<Vec<SeshuJob>> {
        if self.fail_scan {
            return Err(SeshuError::store("mock job store unavailable"));
        }
        self.inner.scan_due_within(now_hour, hours).await
    }
}
