//! Extractor implementations.

pub mod facebook;
pub mod markdown;
pub mod openai;
pub mod prompts;

pub use facebook::{parse_facebook_events, FacebookExtractor};
pub use openai::{parse_candidates, OpenAiExtractor};
