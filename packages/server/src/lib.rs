// Seshu server - API Core
//
// HTTP surface, scrape queue, and scheduled dispatch around the `seshu`
// ingestion pipeline. Operators submit event listing URLs, review what the
// model extracted, and register confirmed sources as recurring scrape jobs.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::*;
