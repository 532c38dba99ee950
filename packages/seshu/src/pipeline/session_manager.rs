//! Scrape-and-extract entry point.
//!
//! A submission fetches the page, asks the extractor for event candidates and
//! saves the result as a draft session the operator then reviews. Recursive
//! (`rs`) submissions additionally link the parent listing's session to the
//! child page.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SeshuError};
use crate::extractors::FacebookExtractor;
use crate::source_url::SourceUrl;
use crate::traits::extractor::Extractor;
use crate::traits::scraper::{FetchOptions, Scraper};
use crate::traits::store::SessionStore;
use crate::types::{EventCandidate, KnownScrapeSource, ScrapeMode, SeshuSession};

/// Largest HTML body kept on a session, in bytes.
pub const HTML_CAP_BYTES: usize = 395 * 1024;

/// How long a draft session lives without being touched.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

const DEFAULT_FETCH_TIMEOUT_MS: u64 = 60_000;

/// Longest parent/child chain followed when checking for cycles.
const MAX_CHAIN_DEPTH: usize = 64;

/// Body of a scrape submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitPayload {
    #[serde(default)]
    pub url: String,
    /// Listing page the `url` was discovered from (`rs` only)
    #[serde(default)]
    pub parent_url: Option<String>,
}

impl SubmitPayload {
    pub fn init(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parent_url: None,
        }
    }

    pub fn recursive(parent_url: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parent_url: Some(parent_url.into()),
        }
    }
}

/// Explicit geo context an operator attaches to a draft.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationUpdate {
    pub url: String,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub location_latitude: Option<f64>,
    #[serde(default)]
    pub location_longitude: Option<f64>,
}

/// Cut `html` to at most `cap` bytes on a character boundary.
///
/// Returns the kept text and whether anything was dropped.
pub fn truncate_html(mut html: String, cap: usize) -> (String, bool) {
    if html.len() <= cap {
        return (html, false);
    }
    let mut end = cap;
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    html.truncate(end);
    (html, true)
}

/// Keep the scraper's own validation errors, classify everything else as an
/// upstream failure of `service`.
fn as_upstream(service: &str, err: SeshuError) -> SeshuError {
    match err {
        e @ (SeshuError::Validation { .. } | SeshuError::Upstream { .. }) => e,
        other => SeshuError::upstream(service, other.to_string()),
    }
}

/// Runs scrape submissions against injected collaborators.
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    scraper: Arc<dyn Scraper>,
    extractor: Arc<dyn Extractor>,
    /// Reads Facebook pages' embedded event data instead of the model
    facebook: Arc<dyn Extractor>,
    html_cap: usize,
    ttl_secs: i64,
    fetch_timeout_ms: u64,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        scraper: Arc<dyn Scraper>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            sessions,
            scraper,
            extractor,
            facebook: Arc::new(FacebookExtractor::new()),
            html_cap: HTML_CAP_BYTES,
            ttl_secs: SESSION_TTL_SECS,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }

    pub fn with_facebook_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.facebook = extractor;
        self
    }

    pub fn with_html_cap(mut self, cap: usize) -> Self {
        self.html_cap = cap;
        self
    }

    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn with_fetch_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.fetch_timeout_ms = timeout_ms;
        self
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Scrape `payload.url`, extract candidates and save them as a draft.
    ///
    /// Returns the candidates shown to the operator. An empty result saves
    /// nothing.
    #[instrument(skip(self, payload), fields(url = %payload.url, action = %action))]
    pub async fn submit(
        &self,
        action: ScrapeMode,
        payload: SubmitPayload,
        owner_id: &str,
    ) -> Result<Vec<EventCandidate>> {
        let source = parse_submitted(&payload.url)?;
        let parent = match action {
            ScrapeMode::Init => None,
            ScrapeMode::Rs => {
                let parent_url = payload
                    .parent_url
                    .as_deref()
                    .ok_or_else(|| SeshuError::validation("parent_url is required"))?;
                let parent = parse_submitted(parent_url)?;
                if parent.normalized == source.normalized {
                    return Err(SeshuError::validation("a source cannot be its own child"));
                }
                Some(parent)
            }
        };

        let options = FetchOptions::for_source(&source.normalized, self.fetch_timeout_ms);
        let html = self
            .scraper
            .fetch(&source.raw, &options)
            .await
            .map_err(|e| as_upstream("scraper", e))?;
        debug!(html_bytes = html.len(), "page fetched");

        let known_source = source.known_scrape_source();
        let extractor = match known_source {
            KnownScrapeSource::Facebook => &self.facebook,
            KnownScrapeSource::Unknown => &self.extractor,
        };
        let mut candidates = extractor
            .extract(&html, action)
            .await
            .map_err(|e| as_upstream("extractor", e))?;

        if candidates.is_empty() {
            info!("no events found, nothing saved");
            return Ok(candidates);
        }

        let known_source = known_source.to_string();
        for candidate in candidates.iter_mut() {
            candidate.scrape_mode = action;
            candidate.source_url = source.raw.clone();
            candidate.known_scrape_source = known_source.clone();
        }
        if action == ScrapeMode::Rs {
            if let Some(first) = candidates.first_mut() {
                first.url = source.raw.clone();
            }
        }

        let (html, truncated) = truncate_html(html, self.html_cap);
        if truncated {
            warn!(cap = self.html_cap, "page html truncated before saving");
        }

        let now = Utc::now().timestamp();
        let mut session = SeshuSession::draft(&source, owner_id, now, self.ttl_secs);
        session.html = html;
        session.html_truncated = truncated;
        session.event_candidates = candidates.clone();

        // Runs to completion even if the caller stops waiting.
        let sessions = self.sessions.clone();
        let parent_url = parent.map(|p| p.raw);
        let ttl_secs = self.ttl_secs;
        tokio::spawn(async move { persist(sessions, session, parent_url, ttl_secs).await })
            .await
            .map_err(SeshuError::store)??;

        info!(candidates = candidates.len(), "draft session saved");
        Ok(candidates)
    }

    /// Attach explicit geo context to a draft session.
    #[instrument(skip(self, update), fields(url = %update.url))]
    pub async fn update_location(&self, update: LocationUpdate) -> Result<SeshuSession> {
        let url = update.url.trim();
        if url.is_empty() {
            return Err(SeshuError::validation("url is required"));
        }
        if let Some(lat) = update.location_latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(SeshuError::validation(format!("latitude out of range: {}", lat)));
            }
        }
        if let Some(lon) = update.location_longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(SeshuError::validation(format!("longitude out of range: {}", lon)));
            }
        }

        let mut session = self
            .sessions
            .get(url)
            .await?
            .ok_or_else(|| SeshuError::not_found("session"))?;

        session.location_address = update
            .location_address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        session.location_latitude = update.location_latitude;
        session.location_longitude = update.location_longitude;
        session.touch(Utc::now().timestamp(), self.ttl_secs);

        self.sessions.update(&session).await?;
        Ok(session)
    }
}

fn parse_submitted(url: &str) -> Result<SourceUrl> {
    if url.contains('%') {
        return Err(SeshuError::validation(
            "url must not be percent-encoded, submit it as shown in the browser",
        ));
    }
    SourceUrl::parse(url)
}

async fn persist(
    sessions: Arc<dyn SessionStore>,
    mut session: SeshuSession,
    parent_url: Option<String>,
    ttl_secs: i64,
) -> Result<()> {
    if let Some(existing) = sessions.get(&session.url).await? {
        session.created_at = existing.created_at;
        if session.owner_id.is_empty() {
            session.owner_id = existing.owner_id;
        }
        session.child_id = existing.child_id;
        session.location_address = existing.location_address;
        session.location_latitude = existing.location_latitude;
        session.location_longitude = existing.location_longitude;
        session.location_timezone = existing.location_timezone;
    }
    sessions.insert(&session).await?;

    if let Some(parent_url) = parent_url {
        if let Err(e) = link_parent(sessions.as_ref(), &parent_url, &session.url, ttl_secs).await {
            warn!(parent = %parent_url, child = %session.url, error = %e, "failed to link parent session");
        }
    }
    Ok(())
}

async fn link_parent(
    sessions: &dyn SessionStore,
    parent_url: &str,
    child_url: &str,
    ttl_secs: i64,
) -> Result<()> {
    let mut parent = sessions
        .get(parent_url)
        .await?
        .ok_or_else(|| SeshuError::not_found("parent session"))?;

    if leads_back_to(sessions, child_url, parent_url).await? {
        return Err(SeshuError::validation("linking would create a cycle"));
    }

    parent.link_child(child_url)?;
    parent.touch(Utc::now().timestamp(), ttl_secs);
    sessions.update(&parent).await
}

/// Whether following `child_id` links from `start` reaches `target`.
async fn leads_back_to(sessions: &dyn SessionStore, start: &str, target: &str) -> Result<bool> {
    let mut current = start.to_string();
    for _ in 0..MAX_CHAIN_DEPTH {
        let next = match sessions.get(&current).await? {
            Some(session) => session.child_id,
            None => None,
        };
        match next {
            Some(next) if next == target => return Ok(true),
            Some(next) => current = next,
            None => return Ok(false),
        }
    }
    Ok(true)
}
