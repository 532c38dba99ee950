// TestDependencies - in-memory collaborators for testing
//
// Builds a ServerDeps from memory stores and the seshu mocks, keeping typed
// handles so tests can inspect what the server did.

use std::sync::Arc;

use seshu::testing::{MockExtractor, MockScraper, RecordingQueue};
use seshu::{EventCandidate, MemoryJobStore, MemorySessionStore, MemoryWatermark};

use super::ServerDeps;

pub struct TestDependencies {
    pub sessions: Arc<MemorySessionStore>,
    pub jobs: Arc<MemoryJobStore>,
    pub scraper: Arc<MockScraper>,
    pub extractor: Arc<MockExtractor>,
    pub queue: Arc<RecordingQueue>,
    pub watermark: Arc<MemoryWatermark>,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(MemorySessionStore::new()),
            jobs: Arc::new(MemoryJobStore::new()),
            scraper: Arc::new(MockScraper::new().with_html("<html><body></body></html>")),
            extractor: Arc::new(MockExtractor::new()),
            queue: Arc::new(RecordingQueue::new()),
            watermark: Arc::new(MemoryWatermark::new()),
        }
    }

    /// Page served for every scrape
    pub fn with_html(mut self, html: &str) -> Self {
        self.scraper = Arc::new(MockScraper::new().with_html(html));
        self
    }

    pub fn with_failing_scraper(mut self) -> Self {
        self.scraper = Arc::new(MockScraper::new().failing());
        self
    }

    /// Candidates returned by every extraction
    pub fn with_candidates(mut self, candidates: Vec<EventCandidate>) -> Self {
        self.extractor = Arc::new(MockExtractor::new().with_candidates(candidates));
        self
    }

    pub fn with_failing_extractor(mut self) -> Self {
        self.extractor = Arc::new(MockExtractor::new().failing());
        self
    }

    pub fn with_queue(mut self, queue: RecordingQueue) -> Self {
        self.queue = Arc::new(queue);
        self
    }

    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps {
            db_pool: None,
            sessions: self.sessions.clone(),
            jobs: self.jobs.clone(),
            scraper: self.scraper.clone(),
            extractor: self.extractor.clone(),
            queue: self.queue.clone(),
            watermark: self.watermark.clone(),
            jetstream: None,
        }
    }
}
