use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

use link_harvest::HarvestConfig;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    pub max_content_chars: Option<usize>,
    pub max_html_chars: Option<usize>,
    pub user_agent: Option<String>,
    pub fetch_rps: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        let _ = dotenv();

        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_model: env::var("OPENAI_MODEL").ok(),
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            batch_size: parse_var("HARVEST_BATCH_SIZE")?,
            concurrency: parse_var("HARVEST_CONCURRENCY")?,
            timeout_secs: parse_var("HARVEST_TIMEOUT_SECS")?,
            fetch_timeout_secs: parse_var("HARVEST_FETCH_TIMEOUT_SECS")?,
            max_content_chars: parse_var("HARVEST_MAX_CONTENT_CHARS")?,
            max_html_chars: parse_var("HARVEST_MAX_HTML_CHARS")?,
            user_agent: env::var("HARVEST_USER_AGENT").ok(),
            fetch_rps: parse_var("HARVEST_FETCH_RPS")?.unwrap_or(5),
        })
    }

    /// Library config with env overrides applied.
    pub fn harvest_config(&self) -> HarvestConfig {
        let mut config = HarvestConfig::default();
        if let Some(size) = self.batch_size {
            config = config.with_batch_size(size);
        }
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_call_timeout_secs(secs);
        }
        if let Some(secs) = self.fetch_timeout_secs {
            config = config.with_fetch_timeout_secs(secs);
        }
        if self.max_content_chars.is_some() || self.max_html_chars.is_some() {
            let content = self.max_content_chars.unwrap_or(config.max_content_chars);
            let html = self.max_html_chars.unwrap_or(config.max_html_chars);
            config = config.with_content_limits(content, html);
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.as_str());
        }
        config
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be a valid number")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            openai_api_key: "sk-test".to_string(),
            openai_model: None,
            openai_base_url: None,
            batch_size: None,
            concurrency: None,
            timeout_secs: None,
            fetch_timeout_secs: None,
            max_content_chars: None,
            max_html_chars: None,
            user_agent: None,
            fetch_rps: 5,
        }
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let harvest = config().harvest_config();
        let defaults = HarvestConfig::default();

        assert_eq!(harvest.batch_size, defaults.batch_size);
        assert_eq!(harvest.max_html_chars, defaults.max_html_chars);
        assert_eq!(harvest.user_agent, defaults.user_agent);
    }

    #[test]
    fn test_overrides_applied() {
        let harvest = Config {
            batch_size: Some(3),
            fetch_timeout_secs: Some(7),
            max_content_chars: Some(2_000),
            user_agent: Some("harvest-test".to_string()),
            ..config()
        }
        .harvest_config();

        assert_eq!(harvest.batch_size, 3);
        assert_eq!(harvest.fetch_timeout_secs, 7);
        assert_eq!(harvest.max_content_chars, 2_000);
        assert_eq!(
            harvest.max_html_chars,
            HarvestConfig::default().max_html_chars
        );
        assert_eq!(harvest.user_agent, "harvest-test");
    }
}
