//! Wiring of core components from configuration.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use tubewalk_core::classifier::{
    create_llm_client, LlmClient, LlmJudge, LlmJudgeConfig, LlmThumbnailReader,
    RelevanceClassifier, SqliteJudgmentCache,
};
use tubewalk_core::{
    create_renderer, Config, CrawlPipeline, PageRenderer, ProxyPool, VideoFetcher,
};

/// Build the crawl pipeline described by `config`.
pub fn build_pipeline(config: &Config) -> Result<CrawlPipeline> {
    let renderer = create_renderer(&config.fetcher).context("Failed to create page renderer")?;
    info!("Using page renderer: {}", renderer.name());

    let proxies = ProxyPool::from_config(&config.proxy).context("Failed to build proxy pool")?;
    if proxies.is_direct() {
        info!("No proxies configured, connecting directly");
    } else {
        info!("Proxy pool initialized with {} entries", proxies.len());
    }

    let fetcher = Arc::new(VideoFetcher::new(
        renderer,
        Arc::new(proxies),
        config.fetcher.clone(),
    ));
    let pipeline = CrawlPipeline::new(fetcher);

    match build_classifier(config)? {
        Some(classifier) => Ok(pipeline.with_classifier(Arc::new(classifier))),
        None => Ok(pipeline),
    }
}

fn build_classifier(config: &Config) -> Result<Option<RelevanceClassifier>> {
    let classifier_config = &config.classifier;
    let llm = match (&classifier_config.llm, classifier_config.enabled) {
        (Some(llm), true) => llm,
        (None, true) => {
            warn!("No [classifier.llm] configured; every record will have relevance tier unknown");
            return Ok(None);
        }
        (_, false) => {
            info!("Relevance classification disabled");
            return Ok(None);
        }
    };

    let client = create_llm_client(llm).context("Failed to create LLM client")?;
    info!(
        "Relevance classifier using {} model {}",
        client.provider(),
        client.model()
    );

    let judge = LlmJudge::with_config(
        client.clone(),
        LlmJudgeConfig {
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
        },
    );
    let mut classifier = RelevanceClassifier::new(Arc::new(judge), classifier_config.clone());

    if let Some(path) = &classifier_config.cache_path {
        let cache = SqliteJudgmentCache::new(path)
            .with_context(|| format!("Failed to open judgment cache at {:?}", path))?;
        info!("Judgment cache at {:?}", path);
        classifier = classifier.with_cache(Arc::new(cache));
    }

    if classifier_config.use_thumbnail_text {
        classifier = classifier.with_thumbnail_reader(Arc::new(LlmThumbnailReader::new(client)));
    }

    Ok(Some(classifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubewalk_core::classifier::{LlmConfig, LlmProvider};

    fn llm() -> LlmConfig {
        LlmConfig {
            provider: LlmProvider::OpenAi,
            model: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
            api_base: None,
            timeout_secs: 30,
            max_tokens: 512,
            temperature: 0.0,
        }
    }

    #[test]
    fn test_default_config_builds_without_classifier() {
        let config = Config::default();
        assert!(build_pipeline(&config).is_ok());
        assert!(build_classifier(&config).unwrap().is_none());
    }

    #[test]
    fn test_classifier_built_with_llm_and_topics() {
        let mut config = Config::default();
        config.topics = vec!["espresso".to_string()];
        config.classifier.llm = Some(llm());
        let classifier = build_classifier(&config).unwrap().unwrap();
        assert_eq!(classifier.judge_name(), "llm");
    }

    #[test]
    fn test_invalid_proxy_entry_fails() {
        let mut config = Config::default();
        config.proxy.entries = vec!["nope".to_string()];
        assert!(build_pipeline(&config).is_err());
    }
}
