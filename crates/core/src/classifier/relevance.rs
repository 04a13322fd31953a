//! Relevance classification of crawled videos.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::cache::{JudgmentCache, MemoryJudgmentCache};
use super::config::ClassifierConfig;
use super::judge::RelevanceJudge;
use super::rate_limiter::RequestLimiter;
use super::thumbnail::ThumbnailReader;
use super::types::{
    ClassificationError, ClassificationErrorKind, JudgmentInput, ReferenceTopics, RelevanceResult,
};
use crate::metrics;
use crate::video::VideoRecord;

/// Scores videos against reference topics through a [`RelevanceJudge`].
///
/// Judgments are cached per video and topic list. Calls to the judge are
/// bounded by a semaphore and a request-per-minute budget, and retryable
/// failures are retried with exponential backoff up to `max_attempts`.
pub struct RelevanceClassifier {
    judge: Arc<dyn RelevanceJudge>,
    thumbnails: Option<Arc<dyn ThumbnailReader>>,
    cache: Arc<dyn JudgmentCache>,
    limiter: RequestLimiter,
    permits: Semaphore,
    config: ClassifierConfig,
}

impl RelevanceClassifier {
    pub fn new(judge: Arc<dyn RelevanceJudge>, config: ClassifierConfig) -> Self {
        Self {
            judge,
            thumbnails: None,
            cache: Arc::new(MemoryJudgmentCache::new()),
            limiter: RequestLimiter::new(config.requests_per_minute),
            permits: Semaphore::new(config.concurrency.max(1)),
            config,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn JudgmentCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_thumbnail_reader(mut self, reader: Arc<dyn ThumbnailReader>) -> Self {
        self.thumbnails = Some(reader);
        self
    }

    /// How many classifications may usefully run at once.
    pub fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }

    pub fn judge_name(&self) -> &str {
        self.judge.name()
    }

    /// Classify one record.
    pub async fn classify(
        &self,
        record: &VideoRecord,
        topics: &ReferenceTopics,
    ) -> Result<RelevanceResult, ClassificationError> {
        let fingerprint = topics.fingerprint();

        match self.cache.get(&record.video, &fingerprint) {
            Ok(Some(cached)) if cached.is_fresh(Utc::now(), self.config.cache_ttl()) => {
                metrics::CLASSIFICATIONS.with_label_values(&["cache_hit"]).inc();
                debug!(video = %record.video, "Judgment cache hit");
                return Ok(RelevanceResult::judged(record.video.clone(), cached.judgment, true));
            }
            Ok(_) => {}
            Err(e) => warn!(video = %record.video, "Judgment cache read failed: {}", e),
        }

        let _permit = self.permits.acquire().await.map_err(|_| {
            ClassificationError::new(ClassificationErrorKind::Unavailable, "classifier shut down")
        })?;

        let input = JudgmentInput {
            video: record.video.clone(),
            title: record.title.clone(),
            thumbnail_text: self.thumbnail_text(record).await,
        };

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            self.limiter.acquire().await;
            match self.judge.judge(&input, topics).await {
                Ok(judgment) => {
                    metrics::CLASSIFICATIONS.with_label_values(&["judged"]).inc();
                    if let Err(e) = self.cache.put(&record.video, &fingerprint, &judgment, Utc::now()) {
                        warn!(video = %record.video, "Judgment cache write failed: {}", e);
                    }
                    debug!(video = %record.video, score = judgment.score, "Judged");
                    return Ok(RelevanceResult::judged(record.video.clone(), judgment, false));
                }
                Err(e) => {
                    metrics::CLASSIFICATIONS
                        .with_label_values(&[e.kind.as_str()])
                        .inc();
                    if !e.kind.is_retryable() || attempt >= max_attempts {
                        return Err(e);
                    }
                    let backoff = self.config.retry_backoff() * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        video = %record.video,
                        attempt,
                        max_attempts,
                        "Judge failed, retrying in {:?}: {}",
                        backoff,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn thumbnail_text(&self, record: &VideoRecord) -> Option<String> {
        if !self.config.use_thumbnail_text {
            return None;
        }
        let reader = self.thumbnails.as_ref()?;
        let url = record.thumbnail_ref.as_deref()?;

        self.limiter.acquire().await;
        match reader.extract_text(url).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!(video = %record.video, "Thumbnail text unavailable: {}", e);
                None
            }
        }
    }
}
