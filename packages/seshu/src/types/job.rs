//! Recurring scrape schedule records.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SeshuError};

/// Marker stored in place of CSS paths for sources scraped by a dedicated parser.
pub const BYPASS_CSS_PATH: &str = "_BYPASS_";

/// Scrape health of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Healthy,
    Warning,
    Failing,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Healthy => write!(f, "HEALTHY"),
            JobStatus::Warning => write!(f, "WARNING"),
            JobStatus::Failing => write!(f, "FAILING"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = SeshuError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HEALTHY" => Ok(JobStatus::Healthy),
            "WARNING" => Ok(JobStatus::Warning),
            "FAILING" => Ok(JobStatus::Failing),
            _ => Err(SeshuError::validation(format!("invalid job status: {}", s))),
        }
    }
}

/// Sources with a dedicated parser instead of CSS selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KnownScrapeSource {
    Facebook,
    #[default]
    Unknown,
}

impl fmt::Display for KnownScrapeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnownScrapeSource::Facebook => write!(f, "FACEBOOK"),
            KnownScrapeSource::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl std::str::FromStr for KnownScrapeSource {
    type Err = SeshuError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FACEBOOK" => Ok(KnownScrapeSource::Facebook),
            "UNKNOWN" | "" => Ok(KnownScrapeSource::Unknown),
            _ => Err(SeshuError::validation(format!("invalid scrape source: {}", s))),
        }
    }
}

/// CSS paths locating each event field on the source page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelectors {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub href: String,
}

impl TargetSelectors {
    /// Selectors for sources that skip CSS-based scraping entirely.
    pub fn bypass() -> Self {
        Self {
            name: BYPASS_CSS_PATH.to_string(),
            location: BYPASS_CSS_PATH.to_string(),
            start_time: BYPASS_CSS_PATH.to_string(),
            end_time: BYPASS_CSS_PATH.to_string(),
            description: BYPASS_CSS_PATH.to_string(),
            href: BYPASS_CSS_PATH.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.location.is_empty()
            && self.start_time.is_empty()
            && self.end_time.is_empty()
            && self.description.is_empty()
            && self.href.is_empty()
    }
}

/// Durable recurring-scrape schedule, created once a session is submitted.
///
/// `(normalized_url_key, owner_id)` is unique across all jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeshuJob {
    pub normalized_url_key: String,
    pub owner_id: String,
    #[serde(default)]
    pub location_latitude: Option<f64>,
    #[serde(default)]
    pub location_longitude: Option<f64>,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub location_timezone: Option<String>,
    /// UTC hour of day (0-23) at which the job becomes due.
    pub scheduled_hour: i32,
    #[serde(default)]
    pub targets: TargetSelectors,
    #[serde(default)]
    pub child_targets: TargetSelectors,
    #[serde(default)]
    pub is_recursive: bool,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub last_scrape_success: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_scrape_failure: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_scrape_failure_count: i32,
    #[serde(default)]
    pub known_scrape_source: KnownScrapeSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SeshuJob {
    /// A healthy job scheduled for the hour after `now`, so the next hourly
    /// dispatch picks it up.
    pub fn new(
        normalized_url_key: impl Into<String>,
        owner_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            normalized_url_key: normalized_url_key.into(),
            owner_id: owner_id.into(),
            location_latitude: None,
            location_longitude: None,
            location_address: None,
            location_timezone: None,
            scheduled_hour: (now.hour() as i32 + 1) % 24,
            targets: TargetSelectors::default(),
            child_targets: TargetSelectors::default(),
            is_recursive: false,
            status: JobStatus::Healthy,
            last_scrape_success: None,
            last_scrape_failure: None,
            last_scrape_failure_count: 0,
            known_scrape_source: KnownScrapeSource::Unknown,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the fields a caller may set directly.
    pub fn validate(&self) -> Result<()> {
        if self.normalized_url_key.trim().is_empty() {
            return Err(SeshuError::validation("normalized_url_key is required"));
        }
        if self.owner_id.trim().is_empty() {
            return Err(SeshuError::Auth);
        }
        if !(0..24).contains(&self.scheduled_hour) {
            return Err(SeshuError::validation(format!(
                "scheduled_hour must be 0-23, got {}",
                self.scheduled_hour
            )));
        }
        Ok(())
    }

    /// Whether `scheduled_hour` lies in `[now_hour, now_hour + hours)`, wrapping at midnight.
    pub fn is_due_within(&self, now_hour: u32, hours: u32) -> bool {
        let hours = hours.min(24) as i32;
        let delta = (self.scheduled_hour - now_hour as i32).rem_euclid(24);
        delta < hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 5, 0).unwrap()
    }

    #[test]
    fn test_new_job_is_scheduled_for_next_hour() {
        assert_eq!(SeshuJob::new("k", "o", at_hour(10)).scheduled_hour, 11);
        assert_eq!(SeshuJob::new("k", "o", at_hour(23)).scheduled_hour, 0);
    }

    #[test]
    fn test_due_window_wraps_midnight() {
        let mut job = SeshuJob::new("k", "o", at_hour(0));
        job.scheduled_hour = 1;
        assert!(job.is_due_within(23, 3));
        assert!(!job.is_due_within(23, 2));
        assert!(job.is_due_within(1, 1));
        assert!(!job.is_due_within(2, 1));
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [JobStatus::Healthy, JobStatus::Warning, JobStatus::Failing] {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
        assert!("healthy".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_hour() {
        let mut job = SeshuJob::new("https://example.com/", "o", at_hour(4));
        job.scheduled_hour = 24;
        assert!(matches!(job.validate(), Err(SeshuError::Validation { .. })));
    }
}
