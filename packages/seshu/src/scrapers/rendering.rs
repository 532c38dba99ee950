//! Scraping-API client for JavaScript-heavy pages.
//!
//! The API renders the page in a headless browser and returns the final
//! HTML. Everything is passed as query parameters on a single GET.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, SeshuError};
use crate::traits::scraper::{FetchOptions, Scraper};

const SERVICE: &str = "scraping api";

/// Scraper backed by a rendering scraping API.
pub struct RenderingScraper {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RenderingScraper {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| SeshuError::upstream(SERVICE, e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn query(&self, url: &str, options: &FetchOptions) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("url", url.to_string()),
            ("render_js", options.render_js.to_string()),
        ];
        if options.render_js && options.wait_ms > 0 {
            params.push(("wait", options.wait_ms.to_string()));
        }
        if let Some(selector) = options.wait_for.as_deref().filter(|s| !s.is_empty()) {
            params.push(("wait_for", selector.to_string()));
        }
        params
    }

    async fn send(&self, url: &str, options: &FetchOptions) -> Result<String> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query(url, options))
            .send()
            .await
            .map_err(|e| SeshuError::upstream(SERVICE, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(url = %url, status = %status, "scraping api error");
            return Err(SeshuError::upstream(
                SERVICE,
                format!("{} - {}", status, text.chars().take(200).collect::<String>()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| SeshuError::upstream(SERVICE, e.to_string()))
    }
}

#[async_trait]
impl Scraper for RenderingScraper {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String> {
        // The API encodes `url` itself; an already-encoded URL would be
        // encoded twice.
        if url.contains('%') {
            return Err(SeshuError::validation("url must not be percent-encoded"));
        }
        debug!(url = %url, wait_ms = options.wait_ms, render_js = options.render_js, "fetching via scraping api");

        tokio::time::timeout(Duration::from_millis(options.timeout_ms), self.send(url, options))
            .await
            .map_err(|_| {
                SeshuError::upstream(SERVICE, format!("timed out after {}ms", options.timeout_ms))
            })?
    }
}
