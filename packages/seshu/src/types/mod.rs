//! Domain types for sessions, jobs, and event candidates.

pub mod candidate;
pub mod job;
pub mod session;

pub use candidate::{is_flagged, EventCandidate, EventField, EventValidation, ScrapeMode};
pub use job::{JobStatus, KnownScrapeSource, SeshuJob, TargetSelectors, BYPASS_CSS_PATH};
pub use session::{SeshuSession, SessionStatus};
