//! Turning a reviewed draft session into a recurring scrape job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::error::{Result, SeshuError};
use crate::pipeline::location::derive_location;
use crate::pipeline::selectors::find_targets;
use crate::pipeline::validator::filter_validated;
use crate::source_url::{is_facebook_events_url, normalize_url};
use crate::traits::store::{JobStore, SessionStore};
use crate::types::{
    EventCandidate, EventField, EventValidation, KnownScrapeSource, SeshuJob, SessionStatus,
    TargetSelectors,
};

/// Finalizes reviewed sessions into jobs.
pub struct Finalizer {
    sessions: Arc<dyn SessionStore>,
    jobs: Arc<dyn JobStore>,
}

impl Finalizer {
    pub fn new(sessions: Arc<dyn SessionStore>, jobs: Arc<dyn JobStore>) -> Self {
        Self { sessions, jobs }
    }

    /// Submit the session stored under `session_url` with the operator's
    /// per-field validations and register its recurring job.
    ///
    /// Nothing is written unless every check passes. The job is created
    /// before the session is marked submitted.
    #[instrument(skip(self, validations), fields(url = %session_url, owner = %caller_id))]
    pub async fn finalize(
        &self,
        session_url: &str,
        validations: Vec<EventValidation>,
        caller_id: &str,
    ) -> Result<SeshuJob> {
        self.finalize_at(session_url, validations, caller_id, Utc::now())
            .await
    }

    pub async fn finalize_at(
        &self,
        session_url: &str,
        validations: Vec<EventValidation>,
        caller_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SeshuJob> {
        let caller_id = caller_id.trim();
        if caller_id.is_empty() {
            return Err(SeshuError::Auth);
        }
        let session_url = session_url.trim();
        if session_url.is_empty() {
            return Err(SeshuError::validation("url is required"));
        }
        if let Some(row) = validations.iter().find(|row| row.len() > EventField::ALL.len()) {
            return Err(SeshuError::validation(format!(
                "validation rows have at most {} fields, got {}",
                EventField::ALL.len(),
                row.len()
            )));
        }

        let mut session = self
            .sessions
            .get(session_url)
            .await?
            .ok_or_else(|| SeshuError::not_found("session"))?;
        if session.status == SessionStatus::Submitted {
            return Err(SeshuError::conflict(session.url.clone()));
        }
        if validations.len() != session.event_candidates.len() {
            return Err(SeshuError::validation(format!(
                "expected {} validation rows, got {}",
                session.event_candidates.len(),
                validations.len()
            )));
        }

        let validated = filter_validated(&session.event_candidates, &validations);
        let Some(first) = validated.first().cloned() else {
            return Err(SeshuError::validation("no validated events"));
        };

        let key = normalize_url(&session.url)?;
        if self.jobs.get(&key, caller_id).await?.is_some() {
            return Err(SeshuError::conflict(key));
        }

        let derived = derive_location(&validated);
        // Operator-supplied address or coordinates win over derivation
        if !session.has_location() {
            session.location_address = derived.address;
        }
        if session.location_timezone.is_none() {
            session.location_timezone = derived.timezone;
        }

        let facebook = is_facebook_events_url(&key);
        let mut job = SeshuJob::new(key, caller_id, now);
        job.location_address = session.location_address.clone();
        job.location_timezone = session.location_timezone.clone();
        job.location_latitude = session.location_latitude;
        job.location_longitude = session.location_longitude;
        job.known_scrape_source = if facebook {
            KnownScrapeSource::Facebook
        } else {
            KnownScrapeSource::Unknown
        };
        job.targets = if facebook {
            TargetSelectors::bypass()
        } else {
            locate(session.html.clone(), session.url.clone(), first).await?
        };

        if let Some(child_url) = session.child_id.as_deref() {
            if let Some(child) = self.sessions.get(child_url).await? {
                job.is_recursive = true;
                job.child_targets = match child.event_candidates.into_iter().next() {
                    _ if facebook => TargetSelectors::bypass(),
                    Some(candidate) => locate(child.html, child.url, candidate).await?,
                    None => TargetSelectors::default(),
                };
            }
        }
        job.validate()?;

        self.jobs.create(&job).await?;

        session.submit(validations)?;
        session.updated_at = now.timestamp();
        self.sessions.update(&session).await?;

        info!(
            key = %job.normalized_url_key,
            scheduled_hour = job.scheduled_hour,
            recursive = job.is_recursive,
            "session submitted"
        );
        Ok(job)
    }
}

/// Selector discovery parses the whole page, so keep it off the async workers.
async fn locate(html: String, page_url: String, candidate: EventCandidate) -> Result<TargetSelectors> {
    tokio::task::spawn_blocking(move || find_targets(&html, &page_url, &candidate))
        .await
        .map_err(SeshuError::store)
}
