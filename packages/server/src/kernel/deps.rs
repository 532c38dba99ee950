//! Server dependencies (using traits for testability)
//!
//! Every collaborator of the pipeline sits behind a `seshu` trait, so tests
//! assemble the same container from in-memory stores and mocks.

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use seshu::{
    Extractor, FileWatermark, HttpScraper, JobStore, OpenAiExtractor, PostgresJobStore,
    PostgresSessionStore, Queue, RenderingScraper, Scraper, SessionStore, WatermarkStore,
};

use crate::config::Config;
use crate::kernel::nats::JetStreamQueue;

/// How long the extractor waits for one chat completion.
const EXTRACTOR_TIMEOUT: Duration = Duration::from_secs(90);

/// Server dependencies accessible to handlers and scheduled tasks
#[derive(Clone)]
pub struct ServerDeps {
    /// Only set when the stores are Postgres-backed
    pub db_pool: Option<PgPool>,
    pub sessions: Arc<dyn SessionStore>,
    pub jobs: Arc<dyn JobStore>,
    pub scraper: Arc<dyn Scraper>,
    pub extractor: Arc<dyn Extractor>,
    pub queue: Arc<dyn Queue>,
    pub watermark: Arc<dyn WatermarkStore>,
    /// Only set when the queue is a live JetStream connection
    pub jetstream: Option<Arc<JetStreamQueue>>,
}

impl ServerDeps {
    /// Production wiring: Postgres stores, JetStream queue, file watermark.
    pub async fn connect(config: &Config, pool: PgPool) -> Result<Self> {
        let scraper: Arc<dyn Scraper> = match config.scraping_api() {
            Some((url, key)) => {
                tracing::info!(api = %url, "Using rendering scrape API");
                Arc::new(
                    RenderingScraper::new(url, key)
                        .context("Failed to build rendering scraper")?,
                )
            }
            None => {
                tracing::info!("No scraping API configured, fetching pages directly");
                Arc::new(HttpScraper::new().context("Failed to build HTTP scraper")?)
            }
        };

        let extractor = OpenAiExtractor::new(&config.openai_api_key)
            .context("Failed to build OpenAI extractor")?
            .with_base_url(&config.openai_base_url)
            .with_model(&config.openai_model)
            .with_timeout(EXTRACTOR_TIMEOUT)
            .context("Failed to configure extractor timeout")?;

        let jetstream = Arc::new(
            JetStreamQueue::connect(&config.nats)
                .await
                .context("Failed to open scrape queue")?,
        );

        Ok(Self {
            db_pool: Some(pool.clone()),
            sessions: Arc::new(PostgresSessionStore::new(pool.clone())),
            jobs: Arc::new(PostgresJobStore::new(pool)),
            scraper,
            extractor: Arc::new(extractor),
            queue: jetstream.clone(),
            watermark: Arc::new(FileWatermark::new(&config.dispatch.watermark_path)),
            jetstream: Some(jetstream),
        })
    }
}
