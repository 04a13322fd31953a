//! Relevance classifier configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI Chat Completions API, or any compatible endpoint.
    #[serde(alias = "openai")]
    OpenAi,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

/// LLM client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Model name/identifier.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or compatible servers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u32,
    /// Maximum tokens for completions.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
}

fn default_llm_timeout() -> u32 {
    30
}

fn default_max_tokens() -> u32 {
    512
}

/// Relevance classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Classify kept records at all; requires `llm` (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Concurrent judge calls (default: 2).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Judge requests per minute (default: 30).
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Attempts per record for retryable errors (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay; doubled on every further attempt (default: 1000).
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Feed text read off the thumbnail into the judgment (default: false).
    #[serde(default)]
    pub use_thumbnail_text: bool,
    /// Age after which cached judgments are ignored (default: 7 days).
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// SQLite judgment cache; in-memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
}

fn default_enabled() -> bool {
    true
}

fn default_concurrency() -> usize {
    2
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    7 * 24 * 3600
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            concurrency: default_concurrency(),
            requests_per_minute: default_requests_per_minute(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            use_thumbnail_text: false,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_path: None,
            llm: None,
        }
    }
}

impl ClassifierConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Whether a classifier should be built for this configuration.
    pub fn is_active(&self) -> bool {
        self.enabled && self.llm.is_some()
    }
}
