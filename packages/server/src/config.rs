use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    /// Rendering scrape API; the direct HTTP scraper is used when unset
    pub scraping_api_url: Option<String>,
    pub scraping_api_key: Option<String>,
    pub nats: NatsConfig,
    pub dispatch: DispatchConfig,
}

/// JetStream names for the scrape queue
#[derive(Debug, Clone)]
pub struct NatsConfig {
    pub url: String,
    pub stream_name: String,
    pub subject: String,
    pub durable_name: String,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub watermark_path: PathBuf,
    pub cooldown: Duration,
    pub lookahead_hours: u32,
    pub cron: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            watermark_path: PathBuf::from("last_update.txt"),
            cooldown: Duration::from_secs(30),
            lookahead_hours: 1,
            cron: "0 0 * * * *".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let scraping_api_url = optional("SCRAPING_API_URL");
        let scraping_api_key = optional("SCRAPING_API_KEY");
        if scraping_api_url.is_some() != scraping_api_key.is_some() {
            tracing::warn!(
                "Only one of SCRAPING_API_URL / SCRAPING_API_KEY is set, using the direct HTTP scraper"
            );
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parsed("PORT", 8080).context("PORT must be a valid number")?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_base_url: env::var("OPENAI_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            scraping_api_url,
            scraping_api_key,
            nats: NatsConfig {
                url: env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string()),
                stream_name: env::var("NATS_SESHU_STREAM_NAME")
                    .unwrap_or_else(|_| "SESHU_JOBS".to_string()),
                subject: env::var("NATS_SESHU_SUBJECT")
                    .unwrap_or_else(|_| "seshu.jobs".to_string()),
                durable_name: env::var("NATS_SESHU_DURABLE_NAME")
                    .unwrap_or_else(|_| "seshu-workers".to_string()),
            },
            dispatch: DispatchConfig::from_env()?,
        })
    }

    /// Rendering scrape API credentials, when both halves are configured.
    pub fn scraping_api(&self) -> Option<(&str, &str)> {
        match (&self.scraping_api_url, &self.scraping_api_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}

impl DispatchConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            watermark_path: env::var("DISPATCH_WATERMARK_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.watermark_path),
            cooldown: Duration::from_secs(
                parsed("DISPATCH_COOLDOWN_SECS", defaults.cooldown.as_secs())
                    .context("DISPATCH_COOLDOWN_SECS must be a number of seconds")?,
            ),
            lookahead_hours: parsed("DISPATCH_LOOKAHEAD_HOURS", defaults.lookahead_hours)
                .context("DISPATCH_LOOKAHEAD_HOURS must be a number of hours")?,
            cron: env::var("DISPATCH_CRON").unwrap_or(defaults.cron),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_defaults() {
        let dispatch = DispatchConfig::default();
        assert_eq!(dispatch.cooldown, Duration::from_secs(30));
        assert_eq!(dispatch.lookahead_hours, 1);
        assert_eq!(dispatch.cron, "0 0 * * * *");
        assert_eq!(dispatch.watermark_path, PathBuf::from("last_update.txt"));
    }

    #[test]
    fn test_parsed_rejects_garbage() {
        // Unique key so parallel tests don't observe it
        env::set_var("SESHU_TEST_PARSED_GARBAGE", "soon");
        let err = parsed::<u64>("SESHU_TEST_PARSED_GARBAGE", 5).unwrap_err();
        assert!(err.to_string().contains("SESHU_TEST_PARSED_GARBAGE"));
        env::remove_var("SESHU_TEST_PARSED_GARBAGE");

        assert_eq!(parsed::<u64>("SESHU_TEST_PARSED_UNSET", 5).unwrap(), 5);
    }

    #[test]
    fn test_scraping_api_needs_both_halves() {
        let mut config = Config {
            database_url: "postgres://localhost/seshu".to_string(),
            port: 8080,
            openai_api_key: "sk-test".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            scraping_api_url: Some("https://scraper.example.com".to_string()),
            scraping_api_key: None,
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                stream_name: "SESHU_JOBS".to_string(),
                subject: "seshu.jobs".to_string(),
                durable_name: "seshu-workers".to_string(),
            },
            dispatch: DispatchConfig::default(),
        };
        assert!(config.scraping_api().is_none());

        config.scraping_api_key = Some("key".to_string());
        assert_eq!(
            config.scraping_api(),
            Some(("https://scraper.example.com", "key"))
        );
    }
}
