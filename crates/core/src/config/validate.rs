use super::{types::Config, ConfigError};
use crate::fetcher::RendererBackend;

/// Validate configuration
/// Currently validates:
/// - Crawl limits and filter bounds
/// - Attempt counts and concurrency are non-zero
/// - Proxy entries parse
/// - Browserless URL is set when that renderer is selected
/// - LLM API key is present when the classifier is active
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |section: &str, message: String| {
        ConfigError::ValidationError(format!("{}: {}", section, message))
    };

    config
        .crawl
        .validate()
        .map_err(|e| invalid("crawl", e))?;
    config
        .filter
        .validate()
        .map_err(|e| invalid("filter", e))?;

    // Fetcher validation
    if config.fetcher.max_attempts == 0 {
        return Err(invalid("fetcher", "max_attempts cannot be 0".to_string()));
    }
    if config.fetcher.timeout_secs == 0 {
        return Err(invalid("fetcher", "timeout_secs cannot be 0".to_string()));
    }
    if config.fetcher.renderer == RendererBackend::Browserless
        && config
            .fetcher
            .browserless
            .as_ref()
            .map_or(true, |b| b.url.trim().is_empty())
    {
        return Err(invalid(
            "fetcher",
            "browserless.url is required when renderer = \"browserless\"".to_string(),
        ));
    }

    // Proxy validation
    config
        .proxy
        .endpoints()
        .map_err(|e| invalid("proxy", e.to_string()))?;
    if config.proxy.failure_threshold == 0 {
        return Err(invalid("proxy", "failure_threshold cannot be 0".to_string()));
    }

    // Classifier validation
    let classifier = &config.classifier;
    if classifier.is_active() {
        if classifier.concurrency == 0 {
            return Err(invalid("classifier", "concurrency cannot be 0".to_string()));
        }
        if classifier.max_attempts == 0 {
            return Err(invalid("classifier", "max_attempts cannot be 0".to_string()));
        }
        if classifier.requests_per_minute == 0 {
            return Err(invalid(
                "classifier",
                "requests_per_minute cannot be 0".to_string(),
            ));
        }
        if let Some(llm) = &classifier.llm {
            if llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                return Err(invalid(
                    "classifier",
                    format!("llm.api_key is required for provider {}", llm.provider.as_str()),
                ));
            }
            if llm.model.trim().is_empty() {
                return Err(invalid("classifier", "llm.model cannot be empty".to_string()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{LlmConfig, LlmProvider};
    use crate::fetcher::BrowserlessConfig;

    fn llm(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider: LlmProvider::Anthropic,
            model: "claude-3-haiku-20240307".to_string(),
            api_key: api_key.map(str::to_string),
            api_base: None,
            timeout_secs: 30,
            max_tokens: 512,
            temperature: 0.0,
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_frontier_fails() {
        let mut config = Config::default();
        config.crawl.max_frontier_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.starts_with("crawl:")));
    }

    #[test]
    fn test_validate_inverted_view_bounds_fail() {
        let mut config = Config::default();
        config.filter.min_views = 1000;
        config.filter.max_views = Some(10);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bad_proxy_entry_fails() {
        let mut config = Config::default();
        config.proxy.entries = vec!["10.0.0.1".to_string()];
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("proxy"));
    }

    #[test]
    fn test_validate_browserless_requires_url() {
        let mut config = Config::default();
        config.fetcher.renderer = RendererBackend::Browserless;
        assert!(validate_config(&config).is_err());

        config.fetcher.browserless = Some(BrowserlessConfig {
            url: "http://localhost:3000".to_string(),
            token: None,
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_llm_key_required_when_active() {
        let mut config = Config::default();
        config.classifier.llm = Some(llm(None));
        assert!(validate_config(&config).is_err());

        // A disabled classifier is not checked.
        config.classifier.enabled = false;
        assert!(validate_config(&config).is_ok());

        config.classifier.enabled = true;
        config.classifier.llm = Some(llm(Some("sk-test")));
        assert!(validate_config(&config).is_ok());
    }
}
