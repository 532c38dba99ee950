//! Collaborator seams for the ingestion pipeline.
//!
//! Every external dependency (page fetching, model extraction, persistence,
//! the message queue, and the dispatcher watermark) sits behind one of these
//! traits so the pipeline can be built with explicit, injected handles.

pub mod extractor;
pub mod queue;
pub mod scraper;
pub mod store;
pub mod watermark;
