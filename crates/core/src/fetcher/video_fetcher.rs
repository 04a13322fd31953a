//! Watch-page fetcher with proxy rotation and bounded retries.

use std::sync::Arc;
use tracing::{debug, warn};

use super::config::FetcherConfig;
use super::extractor::ExtractorChain;
use super::page::{parse_channel_page, parse_watch_page};
use super::parse::RunClock;
use super::types::{FetchErrorKind, FetchFailure, PageError, PageRenderer, RenderError};
use crate::metrics;
use crate::proxy::{ProxyError, ProxyLease, ProxyOutcome, ProxyPool};
use crate::video::{VideoDraft, VideoRef};

/// Fetches and parses pages through the proxy pool.
///
/// Every attempt leases a fresh proxy and reports its outcome back to the
/// pool. Timeouts and blocks are retried up to `max_attempts`; missing
/// videos and unrecognized pages fail immediately.
pub struct VideoFetcher {
    renderer: Arc<dyn PageRenderer>,
    proxies: Arc<ProxyPool>,
    watch_extractors: ExtractorChain,
    channel_extractors: ExtractorChain,
    config: FetcherConfig,
}

impl VideoFetcher {
    pub fn new(renderer: Arc<dyn PageRenderer>, proxies: Arc<ProxyPool>, config: FetcherConfig) -> Self {
        Self {
            renderer,
            proxies,
            watch_extractors: ExtractorChain::watch_page(),
            channel_extractors: ExtractorChain::channel_page(),
            config,
        }
    }

    /// Replace the recommendation extractors used on watch pages.
    pub fn with_watch_extractors(mut self, extractors: ExtractorChain) -> Self {
        self.watch_extractors = extractors;
        self
    }

    pub fn proxies(&self) -> &Arc<ProxyPool> {
        &self.proxies
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch a video's watch page and parse it.
    pub async fn fetch(&self, video: &VideoRef, clock: &RunClock) -> Result<VideoDraft, FetchFailure> {
        let url = video.watch_url();
        let limit = self.config.recommendations_per_page;
        self.fetch_with_retries(&url, |html| {
            parse_watch_page(html, video, clock, &self.watch_extractors, limit)
        })
        .await
    }

    /// Fetch a channel's videos tab and return up to `limit` recent uploads.
    pub async fn resolve_channel(&self, channel_url: &str, limit: usize) -> Result<Vec<VideoRef>, FetchFailure> {
        self.fetch_with_retries(channel_url, |html| {
            parse_channel_page(html, &self.channel_extractors, limit)
        })
        .await
    }

    async fn fetch_with_retries<T, F>(&self, url: &str, parse: F) -> Result<T, FetchFailure>
    where
        F: Fn(&str) -> Result<T, PageError>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<PageError> = None;

        for attempt in 1..=max_attempts {
            let lease = match self.proxies.acquire() {
                Ok(lease) => lease,
                Err(err) => {
                    metrics::FETCH_ATTEMPTS.with_label_values(&["no_proxy"]).inc();
                    warn!(url, attempt, "No proxy available: {}", err);
                    if attempt < max_attempts {
                        let ceiling = self.config.exhaustion_wait();
                        let wait = match err {
                            ProxyError::NoProxyAvailable {
                                retry_after: Some(retry_after),
                            } => retry_after.min(ceiling),
                            _ => ceiling,
                        };
                        tokio::time::sleep(wait).await;
                    }
                    continue;
                }
            };

            match self.attempt(url, &lease, &parse).await {
                Ok(value) => {
                    self.proxies.report(&lease, ProxyOutcome::Success);
                    metrics::FETCH_ATTEMPTS.with_label_values(&["success"]).inc();
                    debug!(url, attempt, proxy = %lease.label(), "Fetched page");
                    return Ok(value);
                }
                Err((error, outcome)) => {
                    self.proxies.report(&lease, outcome);
                    metrics::FETCH_ATTEMPTS
                        .with_label_values(&[error.kind.as_str()])
                        .inc();

                    if !error.kind.is_retryable() {
                        debug!(url, attempt, kind = %error.kind, "Fetch failed: {}", error.message);
                        return Err(FetchFailure::Page {
                            kind: error.kind,
                            url: url.to_string(),
                            attempts: attempt,
                            message: error.message,
                        });
                    }

                    warn!(
                        url,
                        attempt,
                        max_attempts,
                        proxy = %lease.label(),
                        kind = %error.kind,
                        "Fetch attempt failed: {}",
                        error.message
                    );
                    last_error = Some(error);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.retry_backoff() * attempt).await;
                    }
                }
            }
        }

        Err(match last_error {
            Some(error) => FetchFailure::Page {
                kind: error.kind,
                url: url.to_string(),
                attempts: max_attempts,
                message: error.message,
            },
            None => FetchFailure::ProxyExhausted {
                url: url.to_string(),
                attempts: max_attempts,
            },
        })
    }

    async fn attempt<T, F>(&self, url: &str, lease: &ProxyLease, parse: &F) -> Result<T, (PageError, ProxyOutcome)>
    where
        F: Fn(&str) -> Result<T, PageError>,
    {
        let rendered = tokio::time::timeout(
            self.config.timeout(),
            self.renderer.render(url, lease.endpoint.as_ref()),
        )
        .await
        .unwrap_or(Err(RenderError::Timeout));

        let html = rendered.map_err(|err| {
            let (kind, outcome) = err.classify();
            (PageError::new(kind, err.to_string()), outcome)
        })?;

        parse(&html).map_err(|err| {
            // The proxy delivered a page; only a challenge counts against it.
            let outcome = if err.kind == FetchErrorKind::Blocked {
                ProxyOutcome::SoftFailure
            } else {
                ProxyOutcome::Success
            };
            (err, outcome)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{ProxyEndpoint, ProxyHealth, ProxyPoolConfig};
    use crate::testing::{fixtures, MockRenderer};
    use chrono::{TimeZone, Utc};

    fn clock() -> RunClock {
        RunClock::at(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap())
    }

    fn config() -> FetcherConfig {
        FetcherConfig {
            retry_backoff_ms: 1,
            exhaustion_wait_ms: 1,
            ..Default::default()
        }
    }

    fn proxied_pool(n: usize) -> Arc<ProxyPool> {
        let endpoints = (0..n)
            .map(|i| ProxyEndpoint::new(format!("10.0.0.{}:3128", i + 1)))
            .collect();
        Arc::new(ProxyPool::new(&ProxyPoolConfig::default(), endpoints))
    }

    fn page(video: &VideoRef, recommendations: &[VideoRef]) -> String {
        fixtures::WatchPage::new(video.clone(), "Some video")
            .views(50_000)
            .published_days_ago(2)
            .recommendations(recommendations.to_vec())
            .render(&clock())
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let renderer = Arc::new(MockRenderer::new());
        let video = fixtures::video_id(1);
        let recs = vec![fixtures::video_id(2), fixtures::video_id(3)];
        renderer.set_page(&video.watch_url(), page(&video, &recs)).await;

        let fetcher = VideoFetcher::new(renderer.clone(), Arc::new(ProxyPool::direct()), config());
        let draft = fetcher.fetch(&video, &clock()).await.unwrap();

        assert_eq!(draft.title, "Some video");
        assert_eq!(draft.view_count, 50_000);
        assert_eq!(draft.publish_age_days, 2);
        assert_eq!(draft.recommendations, recs);
        assert_eq!(renderer.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_timeout_retried_on_next_proxy() {
        let renderer = Arc::new(MockRenderer::new());
        let video = fixtures::video_id(1);
        renderer.set_page(&video.watch_url(), page(&video, &[])).await;
        renderer
            .push_error(&video.watch_url(), RenderError::Timeout)
            .await;

        let pool = proxied_pool(2);
        let fetcher = VideoFetcher::new(renderer.clone(), pool.clone(), config());
        fetcher.fetch(&video, &clock()).await.unwrap();

        let calls = renderer.recorded_calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].proxy.as_deref(), Some("10.0.0.1:3128"));
        assert_eq!(calls[1].proxy.as_deref(), Some("10.0.0.2:3128"));
        assert_eq!(pool.snapshot()[0].consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let renderer = Arc::new(MockRenderer::new());
        let video = fixtures::video_id(1);
        renderer
            .push_error(
                &video.watch_url(),
                RenderError::Status {
                    status: 404,
                    message: "gone".to_string(),
                },
            )
            .await;

        let fetcher = VideoFetcher::new(renderer.clone(), Arc::new(ProxyPool::direct()), config());
        let failure = fetcher.fetch(&video, &clock()).await.unwrap_err();

        assert!(matches!(
            failure,
            FetchFailure::Page {
                kind: FetchErrorKind::NotFound,
                attempts: 1,
                ..
            }
        ));
        assert_eq!(renderer.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let renderer = Arc::new(MockRenderer::new());
        let video = fixtures::video_id(1);
        for _ in 0..5 {
            renderer
                .push_error(&video.watch_url(), RenderError::Network("reset".to_string()))
                .await;
        }

        let fetcher = VideoFetcher::new(renderer.clone(), Arc::new(ProxyPool::direct()), config());
        let failure = fetcher.fetch(&video, &clock()).await.unwrap_err();

        assert_eq!(failure.attempts(), 3);
        assert!(matches!(
            failure,
            FetchFailure::Page {
                kind: FetchErrorKind::Timeout,
                ..
            }
        ));
        assert_eq!(renderer.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_proxy_rejection_bans_proxy() {
        let renderer = Arc::new(MockRenderer::new());
        let video = fixtures::video_id(1);
        renderer.set_page(&video.watch_url(), page(&video, &[])).await;
        renderer
            .push_error(
                &video.watch_url(),
                RenderError::ProxyRejected("407".to_string()),
            )
            .await;

        let pool = proxied_pool(2);
        let fetcher = VideoFetcher::new(renderer, pool.clone(), config());
        fetcher.fetch(&video, &clock()).await.unwrap();

        let snapshot = pool.snapshot();
        assert_eq!(snapshot[0].health, ProxyHealth::Banned);
        assert_eq!(snapshot[1].health, ProxyHealth::Healthy);
    }

    #[tokio::test]
    async fn test_exhausted_pool_makes_no_render_calls() {
        let renderer = Arc::new(MockRenderer::new());
        let pool = proxied_pool(1);
        let lease = pool.acquire().unwrap();
        pool.report(&lease, ProxyOutcome::HardFailure);

        let fetcher = VideoFetcher::new(renderer.clone(), pool, config());
        let failure = fetcher.fetch(&fixtures::video_id(1), &clock()).await.unwrap_err();

        assert!(matches!(failure, FetchFailure::ProxyExhausted { attempts: 3, .. }));
        assert_eq!(renderer.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_challenge_page_counts_against_proxy() {
        let renderer = Arc::new(MockRenderer::new());
        let video = fixtures::video_id(1);
        renderer
            .set_page(&video.watch_url(), fixtures::challenge_page())
            .await;

        let pool = proxied_pool(1);
        let fetcher = VideoFetcher::new(renderer, pool.clone(), config());
        let failure = fetcher.fetch(&video, &clock()).await.unwrap_err();

        assert!(matches!(
            failure,
            FetchFailure::Page {
                kind: FetchErrorKind::Blocked,
                ..
            }
        ));
        assert_eq!(pool.snapshot()[0].health, ProxyHealth::CoolingDown);
    }

    #[tokio::test]
    async fn test_resolve_channel() {
        let renderer = Arc::new(MockRenderer::new());
        let channel = "https://www.youtube.com/@someone/videos";
        let uploads: Vec<VideoRef> = (1..=4).map(fixtures::video_id).collect();
        renderer
            .set_page(channel, fixtures::channel_page(&uploads))
            .await;

        let fetcher = VideoFetcher::new(renderer, Arc::new(ProxyPool::direct()), config());
        let videos = fetcher.resolve_channel(channel, 2).await.unwrap();
        assert_eq!(videos, uploads[..2].to_vec());
    }
}
