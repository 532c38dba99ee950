// HTTP routes
pub mod dispatch;
pub mod health;
pub mod seshu_jobs;
pub mod seshu_session;

pub use dispatch::*;
pub use health::*;
pub use seshu_jobs::*;
pub use seshu_session::*;

use serde::de::DeserializeOwned;

use seshu::SeshuError;

/// Decode a JSON request body, reporting problems as validation errors.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, SeshuError> {
    if body.is_empty() {
        return Err(SeshuError::validation("request body is required"));
    }
    serde_json::from_slice(body)
        .map_err(|e| SeshuError::validation(format!("invalid request body: {}", e)))
}
