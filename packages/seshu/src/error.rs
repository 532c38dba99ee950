//! Typed errors for the ingestion pipeline.
//!
//! Every failure the pipeline surfaces falls into one of a small set of
//! categories. Each category carries its own HTTP status and a user-facing
//! message so the server can render it without inspecting the inner cause.

use thiserror::Error;

/// Boxed error used for store and queue failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur anywhere in the ingestion pipeline.
#[derive(Debug, Error)]
pub enum SeshuError {
    /// Malformed or missing payload fields
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// Missing operator identity
    #[error("missing operator identity")]
    Auth,

    /// Scrape or extraction failure, including malformed model output
    #[error("{service} failed: {message}")]
    Upstream { service: String, message: String },

    /// Duplicate recurring-source registration
    #[error("source already exists: {key}")]
    Conflict { key: String },

    /// Session or job store unavailable
    #[error("store error: {0}")]
    Store(#[source] BoxError),

    /// Message queue unavailable
    #[error("queue error: {0}")]
    Queue(#[source] BoxError),

    /// Session or job not found
    #[error("not found: {what}")]
    NotFound { what: String },

    /// JSON that could not be decoded
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SeshuError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn conflict(key: impl Into<String>) -> Self {
        Self::Conflict { key: key.into() }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn store(err: impl Into<BoxError>) -> Self {
        Self::Store(err.into())
    }

    pub fn queue(err: impl Into<BoxError>) -> Self {
        Self::Queue(err.into())
    }

    /// HTTP status code for this error category.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 422,
            Self::Auth => 401,
            Self::Upstream { .. } | Self::Json(_) => 502,
            Self::Conflict { .. } => 409,
            Self::Store(_) => 500,
            Self::Queue(_) => 502,
            Self::NotFound { .. } => 404,
        }
    }

    /// Message safe to show an operator. Inner causes stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { reason } => format!("Invalid request: {}", reason),
            Self::Auth => "You must be logged in to do that.".to_string(),
            Self::Upstream { .. } | Self::Json(_) => {
                "We couldn't read events from that page. Please try again.".to_string()
            }
            Self::Conflict { .. } => "This event source already exists.".to_string(),
            Self::Store(_) => "Saving failed, please try again shortly.".to_string(),
            Self::Queue(_) => "The scrape queue is unavailable right now.".to_string(),
            Self::NotFound { what } => format!("No {} was found.", what),
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, SeshuError>;
