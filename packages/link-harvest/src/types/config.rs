//! Configuration for discovery and extraction runs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::HarvestError;

/// Configuration for the harvest pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Links per batch. Batches run one after another.
    ///
    /// Default: 5.
    pub batch_size: usize,

    /// Maximum links in flight inside one batch.
    ///
    /// Default: 5 (the whole batch at once).
    pub concurrency: usize,

    /// Timeout applied to every engine call, in seconds.
    ///
    /// Default: 120.
    pub call_timeout_secs: u64,

    /// Timeout applied to every page fetch, in seconds.
    ///
    /// Default: 30.
    pub fetch_timeout_secs: u64,

    /// Maximum characters of normalized page content put in a prompt.
    ///
    /// Default: 100_000.
    pub max_content_chars: usize,

    /// Maximum characters of raw HTML put in a prompt.
    ///
    /// Default: 100_000.
    pub max_html_chars: usize,

    /// Maximum characters of page content in the plain-text fallback prompt.
    ///
    /// Default: 50_000.
    pub fallback_content_chars: usize,

    /// User agent sent with page fetches.
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            concurrency: 5,
            call_timeout_secs: 120,
            fetch_timeout_secs: 30,
            max_content_chars: 100_000,
            max_html_chars: 100_000,
            fallback_content_chars: 50_000,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl HarvestConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set in-batch concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the engine call timeout.
    pub fn with_call_timeout_secs(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    /// Set the page fetch timeout.
    pub fn with_fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    /// Set prompt content limits.
    pub fn with_content_limits(mut self, content: usize, html: usize) -> Self {
        self.max_content_chars = content;
        self.max_html_chars = html;
        self
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Reject settings that would stall a run.
    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.batch_size == 0 {
            return Err(HarvestError::Config("batch_size must be > 0".into()));
        }
        if self.concurrency == 0 {
            return Err(HarvestError::Config("concurrency must be > 0".into()));
        }
        if self.call_timeout_secs == 0 || self.fetch_timeout_secs == 0 {
            return Err(HarvestError::Config("timeouts must be > 0".into()));
        }
        Ok(())
    }

    /// Number of batches needed for `links` selected links.
    pub fn batch_count(&self, links: usize) -> usize {
        links.div_ceil(self.batch_size.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_backpressure_policy() {
        let config = HarvestConfig::default();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.concurrency, config.batch_size);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_count() {
        let config = HarvestConfig::new();
        assert_eq!(config.batch_count(0), 0);
        assert_eq!(config.batch_count(5), 1);
        assert_eq!(config.batch_count(12), 3);
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(HarvestConfig::new().with_batch_size(0).validate().is_err());
        assert!(HarvestConfig::new().with_concurrency(0).validate().is_err());
    }

    #[test]
    fn test_roundtrips_through_json() {
        let config = HarvestConfig::new().with_batch_size(3);
        let json = serde_json::to_string(&config).unwrap();
        let back: HarvestConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.batch_size, 3);
    }
}
