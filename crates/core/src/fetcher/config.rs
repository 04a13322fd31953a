//! Configuration for page fetching.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Page rendering backend.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RendererBackend {
    /// Plain HTTP GET; YouTube embeds its page data in the initial HTML.
    #[default]
    Http,
    /// A Browserless instance rendering pages in headless Chrome.
    Browserless,
}

/// Browserless connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserlessConfig {
    /// Base URL (e.g., "http://localhost:3000")
    pub url: String,
    /// API token, if the instance requires one
    #[serde(default)]
    pub token: Option<String>,
}

/// Configuration for the page fetcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    /// Attempts per page, including the first (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay between attempts; attempt `n` waits `n` times this (default: 2000).
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Longest wait for a proxy to come back from cooldown (default: 10000).
    #[serde(default = "default_exhaustion_wait_ms")]
    pub exhaustion_wait_ms: u64,

    /// Recommendations harvested per watch page (default: 5).
    #[serde(default = "default_recommendations_per_page")]
    pub recommendations_per_page: usize,

    /// Per-attempt render timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent for the HTTP renderer.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub renderer: RendererBackend,

    /// Required when `renderer = "browserless"`.
    #[serde(default)]
    pub browserless: Option<BrowserlessConfig>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

fn default_exhaustion_wait_ms() -> u64 {
    10_000
}

fn default_recommendations_per_page() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            exhaustion_wait_ms: default_exhaustion_wait_ms(),
            recommendations_per_page: default_recommendations_per_page(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            renderer: RendererBackend::default(),
            browserless: None,
        }
    }
}

impl FetcherConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn exhaustion_wait(&self) -> Duration {
        Duration::from_millis(self.exhaustion_wait_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_backoff(), Duration::from_secs(2));
        assert_eq!(config.recommendations_per_page, 5);
        assert_eq!(config.renderer, RendererBackend::Http);
    }

    #[test]
    fn test_deserialize_browserless() {
        let toml = r#"
renderer = "browserless"
max_attempts = 5

[browserless]
url = "http://localhost:3000"
token = "secret"
"#;
        let config: FetcherConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.renderer, RendererBackend::Browserless);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.timeout_secs, 30);
        let browserless = config.browserless.unwrap();
        assert_eq!(browserless.url, "http://localhost:3000");
        assert_eq!(browserless.token.as_deref(), Some("secret"));
    }
}
