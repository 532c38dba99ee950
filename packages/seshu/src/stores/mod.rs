//! Storage implementations.
//!
//! - [`MemorySessionStore`] / [`MemoryJobStore`] / [`MemoryWatermark`]: tests and development
//! - [`FileWatermark`]: dispatcher watermark that survives restarts
//! - `PostgresSessionStore` / `PostgresJobStore`: production (`postgres` feature)

pub mod file;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use file::FileWatermark;
pub use memory::{MemoryJobStore, MemorySessionStore, MemoryWatermark};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresJobStore, PostgresSessionStore};
