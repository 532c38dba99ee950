//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod nats;
pub mod scheduled_tasks;
pub mod test_dependencies;

pub use deps::ServerDeps;
pub use nats::{decode_job, encode_job, JetStreamQueue};
pub use scheduled_tasks::{run_dispatch, run_session_purge, start_scheduler};
pub use test_dependencies::TestDependencies;
