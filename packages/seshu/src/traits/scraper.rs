//! Page fetching.

use async_trait::async_trait;

use crate::error::Result;
use crate::source_url::is_facebook_events_url;

/// Wait-for selector that signals Facebook has hydrated its event data.
pub const FACEBOOK_WAIT_FOR: &str = "script[data-sjs][data-content-len]";

/// How a single fetch should be performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Deadline for the whole fetch
    pub timeout_ms: u64,
    /// How long a rendering backend lets the page settle before capturing
    pub wait_ms: u64,
    pub render_js: bool,
    /// CSS selector the renderer waits for before capturing
    pub wait_for: Option<String>,
}

impl FetchOptions {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            wait_ms: 0,
            render_js: false,
            wait_for: None,
        }
    }

    pub fn with_wait_ms(mut self, wait_ms: u64) -> Self {
        self.wait_ms = wait_ms;
        self
    }

    pub fn with_render_js(mut self, render_js: bool) -> Self {
        self.render_js = render_js;
        self
    }

    pub fn with_wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for = Some(selector.into());
        self
    }

    /// Defaults for a source: Facebook listings need a longer render and a
    /// hydration selector, everything else renders JS with a short wait.
    pub fn for_source(url: &str, timeout_ms: u64) -> Self {
        if is_facebook_events_url(url) {
            Self::new(timeout_ms)
                .with_wait_ms(7_500)
                .with_render_js(true)
                .with_wait_for(FACEBOOK_WAIT_FOR)
        } else {
            Self::new(timeout_ms).with_wait_ms(4_500).with_render_js(true)
        }
    }
}

/// Fetches raw HTML for a URL.
///
/// Implementations make exactly one attempt and must give up once
/// `options.timeout_ms` has elapsed. Retries belong to the caller.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String>;
}
