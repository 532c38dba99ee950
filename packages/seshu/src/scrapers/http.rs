//! Direct HTTP scraper.
//!
//! Fetches the page with reqwest and a browser-like user agent. There is no
//! JavaScript rendering, so render options are ignored; use it for static
//! sites or when no scraping API is configured.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, SeshuError};
use crate::traits::scraper::{FetchOptions, Scraper};

const SERVICE: &str = "http fetch";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct HttpScraper {
    client: reqwest::Client,
}

impl HttpScraper {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SeshuError::upstream(SERVICE, e.to_string()))?;

        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SeshuError::upstream(SERVICE, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SeshuError::upstream(SERVICE, format!("HTTP {} for {}", status, url)));
        }

        response
            .text()
            .await
            .map_err(|e| SeshuError::upstream(SERVICE, e.to_string()))
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String> {
        let url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        };
        debug!(url = %url, "fetching page directly");

        tokio::time::timeout(Duration::from_millis(options.timeout_ms), self.send(&url))
            .await
            .map_err(|_| {
                SeshuError::upstream(SERVICE, format!("timed out after {}ms", options.timeout_ms))
            })?
    }
}
