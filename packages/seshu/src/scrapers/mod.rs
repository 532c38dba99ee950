//! Scraper implementations.
//!
//! - [`RenderingScraper`]: scraping API with headless-browser rendering
//! - [`HttpScraper`]: plain HTTP fetch, no rendering

pub mod http;
pub mod rendering;

pub use http::HttpScraper;
pub use rendering::RenderingScraper;
