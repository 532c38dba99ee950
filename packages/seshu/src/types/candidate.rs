//! Event candidates proposed by the extractor.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SeshuError};

/// How a candidate was scraped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeMode {
    /// First scrape of a listing page
    #[default]
    Init,
    /// Recursive scrape of a child page discovered from a listing
    Rs,
}

impl fmt::Display for ScrapeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeMode::Init => write!(f, "init"),
            ScrapeMode::Rs => write!(f, "rs"),
        }
    }
}

impl std::str::FromStr for ScrapeMode {
    type Err = SeshuError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "init" => Ok(ScrapeMode::Init),
            "rs" => Ok(ScrapeMode::Rs),
            other => Err(SeshuError::validation(format!("unknown scrape mode: {}", other))),
        }
    }
}

/// A model-proposed event awaiting human confirmation.
///
/// Candidates only ever live inside a session; they are not persisted on
/// their own. Every field defaults to empty so partial model output still
/// decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCandidate {
    #[serde(rename = "event_title", default)]
    pub title: String,

    #[serde(rename = "event_location", default)]
    pub location: String,

    #[serde(rename = "event_start_datetime", default)]
    pub start_time: String,

    #[serde(rename = "event_end_datetime", default)]
    pub end_time: String,

    #[serde(rename = "event_url", default)]
    pub url: String,

    #[serde(rename = "event_description", default)]
    pub description: String,

    #[serde(rename = "event_timezone", default, skip_serializing_if = "String::is_empty")]
    pub timezone: String,

    #[serde(rename = "event_host_name", default, skip_serializing_if = "String::is_empty")]
    pub host_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub known_scrape_source: String,

    #[serde(default)]
    pub scrape_mode: ScrapeMode,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_url: String,
}

impl EventCandidate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = start_time.into();
        self
    }

    pub fn with_end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = end_time.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn field(&self, field: EventField) -> &str {
        match field {
            EventField::Title => &self.title,
            EventField::Location => &self.location,
            EventField::StartTime => &self.start_time,
            EventField::EndTime => &self.end_time,
            EventField::Url => &self.url,
            EventField::Description => &self.description,
        }
    }

    pub fn clear_field(&mut self, field: EventField) {
        match field {
            EventField::Title => self.title.clear(),
            EventField::Location => self.location.clear(),
            EventField::StartTime => self.start_time.clear(),
            EventField::EndTime => self.end_time.clear(),
            EventField::Url => self.url.clear(),
            EventField::Description => self.description.clear(),
        }
    }
}

/// The operator-validated fields of a candidate, in mask order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventField {
    Title,
    Location,
    StartTime,
    EndTime,
    Url,
    Description,
}

impl EventField {
    /// All validated fields, in the order of a validation row.
    pub const ALL: [EventField; 6] = [
        EventField::Title,
        EventField::Location,
        EventField::StartTime,
        EventField::EndTime,
        EventField::Url,
        EventField::Description,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// One validation row: a flag per [`EventField`], positionally.
pub type EventValidation = Vec<bool>;

/// Whether `field` is flagged in `row`. Missing positions count as unflagged.
pub fn is_flagged(row: &[bool], field: EventField) -> bool {
    row.get(field.index()).copied().unwrap_or(false)
}
