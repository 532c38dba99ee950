//! Scrape sessions: one draft per source URL.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, SeshuError};
use crate::source_url::SourceUrl;
use crate::types::candidate::{EventCandidate, EventValidation};

/// Session lifecycle. The only transition is `Draft -> Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Draft,
    Submitted,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Draft => write!(f, "draft"),
            SessionStatus::Submitted => write!(f, "submitted"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = SeshuError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(SessionStatus::Draft),
            "submitted" => Ok(SessionStatus::Submitted),
            _ => Err(SeshuError::validation(format!("invalid session status: {}", s))),
        }
    }
}

/// Draft record of one scrape attempt for a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeshuSession {
    pub owner_id: String,
    pub url: String,
    pub url_domain: String,
    pub url_path: String,
    #[serde(default)]
    pub url_query_params: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub location_latitude: Option<f64>,
    #[serde(default)]
    pub location_longitude: Option<f64>,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub location_timezone: Option<String>,
    pub html: String,
    #[serde(default)]
    pub html_truncated: bool,
    #[serde(default)]
    pub child_id: Option<String>,
    #[serde(default)]
    pub event_candidates: Vec<EventCandidate>,
    #[serde(default)]
    pub event_validations: Vec<EventValidation>,
    #[serde(default)]
    pub status: SessionStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub expire_at: i64,
}

impl SeshuSession {
    /// Create a draft session for `source`, stamped at `now` (unix seconds).
    pub fn draft(source: &SourceUrl, owner_id: impl Into<String>, now: i64, ttl_secs: i64) -> Self {
        Self {
            owner_id: owner_id.into(),
            url: source.raw.clone(),
            url_domain: source.domain.clone(),
            url_path: source.path.clone(),
            url_query_params: source.query_params.clone(),
            location_latitude: None,
            location_longitude: None,
            location_address: None,
            location_timezone: None,
            html: String::new(),
            html_truncated: false,
            child_id: None,
            event_candidates: Vec::new(),
            event_validations: Vec::new(),
            status: SessionStatus::Draft,
            created_at: now,
            updated_at: now,
            expire_at: now + ttl_secs,
        }
    }

    /// Whether the session carries explicit geo context.
    pub fn has_location(&self) -> bool {
        self.location_address
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
            || (self.location_latitude.is_some() && self.location_longitude.is_some())
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expire_at <= now
    }

    /// Refresh `updated_at` and push the expiry forward.
    pub fn touch(&mut self, now: i64, ttl_secs: i64) {
        self.updated_at = now;
        self.expire_at = now + ttl_secs;
    }

    /// Point this session at its paginated/child source.
    pub fn link_child(&mut self, child_url: &str) -> Result<()> {
        if child_url.trim().is_empty() {
            return Err(SeshuError::validation("child url is empty"));
        }
        if child_url == self.url {
            return Err(SeshuError::validation("a source cannot be its own child"));
        }
        self.child_id = Some(child_url.to_string());
        Ok(())
    }

    /// Flip `Draft -> Submitted`, attaching the operator's validations.
    pub fn submit(&mut self, validations: Vec<EventValidation>) -> Result<()> {
        if self.status == SessionStatus::Submitted {
            return Err(SeshuError::conflict(self.url.clone()));
        }
        if validations.len() != self.event_candidates.len() {
            return Err(SeshuError::validation(format!(
                "expected {} validation rows, got {}",
                self.event_candidates.len(),
                validations.len()
            )));
        }
        self.event_validations = validations;
        self.status = SessionStatus::Submitted;
        Ok(())
    }
}
