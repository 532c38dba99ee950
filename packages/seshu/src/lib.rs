//! Seshu: event-source ingestion pipeline
//!
//! Operators submit a URL that lists events. The page is scraped, a language
//! model proposes event candidates, and the operator confirms which fields are
//! real. A confirmed source becomes a recurring job that a periodic dispatcher
//! publishes to a scrape queue once a day.
//!
//! # Flow
//!
//! ```text
//! submit(url) ──> Scraper ──> Extractor ──> draft SeshuSession
//!                                                 │ operator review
//! finalize(url, validations) ──> Validator ──> SeshuJob ──> JobStore
//!                                                               │ hourly
//! Dispatcher::tick ──> scan_due_within ──> Queue::publish ──> watermark
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use seshu::{SessionManager, SubmitPayload, ScrapeMode, MemorySessionStore};
//! use seshu::testing::{MockExtractor, MockScraper};
//!
//! let manager = SessionManager::new(
//!     Arc::new(MemorySessionStore::new()),
//!     Arc::new(MockScraper::new().with_html("<html>...</html>")),
//!     Arc::new(MockExtractor::new()),
//! );
//! let candidates = manager
//!     .submit(ScrapeMode::Init, SubmitPayload::init("https://example.com"), "operator-1")
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator seams (Scraper, Extractor, stores, Queue, watermark)
//! - [`types`] - Sessions, jobs, and event candidates
//! - [`pipeline`] - SessionManager, Validator, Finalizer, Dispatcher
//! - [`stores`] - Memory, file, and Postgres storage
//! - [`scrapers`] - Rendering API and plain HTTP scrapers
//! - [`extractors`] - OpenAI-backed extraction and Facebook event data
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod extractors;
pub mod pipeline;
pub mod scrapers;
pub mod source_url;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{Result, SeshuError};
pub use source_url::{is_facebook_events_url, normalize_url, SourceUrl};
pub use traits::{
    extractor::Extractor,
    queue::Queue,
    scraper::{FetchOptions, Scraper},
    store::{JobStore, SessionStore},
    watermark::WatermarkStore,
};
pub use types::{
    EventCandidate, EventField, EventValidation, JobStatus, KnownScrapeSource, ScrapeMode,
    SeshuJob, SeshuSession, SessionStatus, TargetSelectors, BYPASS_CSS_PATH,
};

pub use pipeline::{
    filter_validated, truncate_html, Dispatcher, Finalizer, LocationUpdate, SessionManager,
    SubmitPayload, TickReport,
};

pub use stores::{FileWatermark, MemoryJobStore, MemorySessionStore, MemoryWatermark};

#[cfg(feature = "postgres")]
pub use stores::{PostgresJobStore, PostgresSessionStore};

pub use extractors::{FacebookExtractor, OpenAiExtractor};
pub use scrapers::{HttpScraper, RenderingScraper};
