use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::classifier::ClassifierConfig;
use crate::fetcher::{FetcherConfig, RendererBackend};
use crate::filter::FilterCriteria;
use crate::pipeline::RunLimits;
use crate::proxy::{ProxyEndpoint, ProxyPoolConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Reference topics for relevance classification
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub crawl: RunLimits,
    #[serde(default)]
    pub filter: FilterCriteria,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub proxy: ProxyPoolConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub topics: Vec<String>,
    pub crawl: RunLimits,
    pub filter: FilterCriteria,
    pub fetcher: SanitizedFetcherConfig,
    pub proxy: SanitizedProxyConfig,
    pub classifier: SanitizedClassifierConfig,
}

/// Sanitized fetcher config (browserless token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFetcherConfig {
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub exhaustion_wait_ms: u64,
    pub recommendations_per_page: usize,
    pub timeout_secs: u64,
    pub renderer: RendererBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browserless_url: Option<String>,
    pub browserless_token_configured: bool,
}

/// Sanitized proxy config (passwords masked)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProxyConfig {
    pub entries: Vec<String>,
    pub failure_threshold: u32,
    pub base_cooldown_secs: u64,
    pub max_cooldown_secs: u64,
}

/// Sanitized classifier config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedClassifierConfig {
    pub enabled: bool,
    pub concurrency: usize,
    pub requests_per_minute: u32,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub use_thumbnail_text: bool,
    pub cache_ttl_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

/// Mask the password of a proxy entry. Unparseable entries are hidden entirely.
fn redact_proxy_entry(entry: &str) -> String {
    entry
        .parse::<ProxyEndpoint>()
        .map(|endpoint| endpoint.redacted())
        .unwrap_or_else(|_| "<invalid>".to_string())
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let fetcher = &config.fetcher;
        let classifier = &config.classifier;
        Self {
            topics: config.topics.clone(),
            crawl: config.crawl.clone(),
            filter: config.filter.clone(),
            fetcher: SanitizedFetcherConfig {
                max_attempts: fetcher.max_attempts,
                retry_backoff_ms: fetcher.retry_backoff_ms,
                exhaustion_wait_ms: fetcher.exhaustion_wait_ms,
                recommendations_per_page: fetcher.recommendations_per_page,
                timeout_secs: fetcher.timeout_secs,
                renderer: fetcher.renderer,
                browserless_url: fetcher.browserless.as_ref().map(|b| b.url.clone()),
                browserless_token_configured: fetcher
                    .browserless
                    .as_ref()
                    .is_some_and(|b| b.token.is_some()),
            },
            proxy: SanitizedProxyConfig {
                entries: config
                    .proxy
                    .entries
                    .iter()
                    .map(|e| redact_proxy_entry(e))
                    .collect(),
                failure_threshold: config.proxy.failure_threshold,
                base_cooldown_secs: config.proxy.base_cooldown_secs,
                max_cooldown_secs: config.proxy.max_cooldown_secs,
            },
            classifier: SanitizedClassifierConfig {
                enabled: classifier.enabled,
                concurrency: classifier.concurrency,
                requests_per_minute: classifier.requests_per_minute,
                max_attempts: classifier.max_attempts,
                retry_backoff_ms: classifier.retry_backoff_ms,
                use_thumbnail_text: classifier.use_thumbnail_text,
                cache_ttl_secs: classifier.cache_ttl_secs,
                cache_path: classifier.cache_path.clone(),
                llm: classifier.llm.as_ref().map(|llm| SanitizedLlmConfig {
                    provider: llm.provider.as_str().to_string(),
                    model: llm.model.clone(),
                    api_base: llm.api_base.clone(),
                    api_key_configured: llm.api_key.is_some(),
                    timeout_secs: llm.timeout_secs,
                }),
            },
        }
    }
}
