//! The ingestion pipeline: scrape and extract into draft sessions, finalize
//! reviewed sessions into jobs, and dispatch due jobs to the queue.

pub mod dispatcher;
pub mod finalize;
pub mod location;
pub mod selectors;
pub mod session_manager;
pub mod validator;

pub use dispatcher::{Dispatcher, TickReport};
pub use finalize::Finalizer;
pub use location::{derive_location, DerivedLocation};
pub use selectors::find_targets;
pub use session_manager::{
    truncate_html, LocationUpdate, SessionManager, SubmitPayload, HTML_CAP_BYTES,
};
pub use validator::{filter_validated, is_sentinel};
