//! OpenAI chat-completions extractor.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Result, SeshuError};
use crate::extractors::markdown::page_lines;
use crate::extractors::prompts::prompt_for;
use crate::traits::extractor::Extractor;
use crate::types::{EventCandidate, ScrapeMode};

const SERVICE: &str = "openai";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// =============================================================================
// Response parsing
// =============================================================================

/// Strip Markdown code fences from a model response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Parse the model's reply as a candidate array.
///
/// Prose before the first `[` and after the last `]` is ignored. Anything
/// between them must be a complete JSON array; truncated output is an error.
pub fn parse_candidates(content: &str) -> Result<Vec<EventCandidate>> {
    let content = strip_code_blocks(content);
    let (Some(start), Some(end)) = (content.find('['), content.rfind(']')) else {
        return Err(SeshuError::upstream(SERVICE, "malformed model output: no JSON array"));
    };
    if end < start {
        return Err(SeshuError::upstream(SERVICE, "malformed model output: no JSON array"));
    }

    serde_json::from_str(&content[start..=end])
        .map_err(|e| SeshuError::upstream(SERVICE, format!("malformed model output: {}", e)))
}

// =============================================================================
// Client
// =============================================================================

/// Extractor that asks an OpenAI-compatible chat model for event candidates.
pub struct OpenAiExtractor {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiExtractor {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| SeshuError::upstream(SERVICE, e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Set a custom base URL (for proxies or compatible APIs).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SeshuError::upstream(SERVICE, e.to_string()))?;
        Ok(self)
    }

    fn request_for(&self, html: &str, mode: ScrapeMode) -> Result<ChatRequest> {
        let lines = serde_json::to_string(&page_lines(html))?;
        Ok(ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: format!("{}{}", prompt_for(mode), lines),
            }],
        })
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                SeshuError::upstream(SERVICE, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(SeshuError::upstream(
                SERVICE,
                format!("completion request returned {}", status),
            ));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SeshuError::upstream(SERVICE, e.to_string()))?;

        if body.id.is_empty() {
            return Err(SeshuError::upstream(SERVICE, "unexpected response format, `id` missing"));
        }
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| SeshuError::upstream(SERVICE, "response had no message content"))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI chat completion"
        );
        Ok(content)
    }
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    async fn extract(&self, html: &str, mode: ScrapeMode) -> Result<Vec<EventCandidate>> {
        let request = self.request_for(html, mode)?;
        let content = self.complete(&request).await?;
        let candidates = parse_candidates(&content)?;
        debug!(mode = %mode, candidates = candidates.len(), "events extracted");
        Ok(candidates)
    }
}
