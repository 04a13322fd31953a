//! Page fetcher.
//!
//! Renders watch pages through the proxy pool, parses the fields the crawl
//! needs (title, publish age, views, thumbnail, recommendations) and
//! classifies failures into retryable and terminal kinds.

mod browserless;
mod config;
mod extractor;
mod http;
mod page;
mod parse;
mod types;
mod video_fetcher;

pub use browserless::BrowserlessRenderer;
pub use config::{BrowserlessConfig, FetcherConfig, RendererBackend};
pub use extractor::{
    ChannelVideosExtractor, CompactRendererExtractor, ExtractorChain, LockupViewModelExtractor,
    RecommendationExtractor, WatchLinkExtractor,
};
pub use http::HttpRenderer;
pub use page::{is_blocked, is_unavailable, parse_channel_page, parse_watch_page};
pub use parse::{parse_absolute_date, parse_publish_age, parse_view_count, RunClock};
pub use types::{FetchErrorKind, FetchFailure, PageError, PageRenderer, RenderError};
pub use video_fetcher::VideoFetcher;

use std::sync::Arc;

/// Create the renderer selected in the configuration.
pub fn create_renderer(config: &FetcherConfig) -> Result<Arc<dyn PageRenderer>, RenderError> {
    match config.renderer {
        RendererBackend::Http => Ok(Arc::new(HttpRenderer::new(
            config.timeout(),
            config.user_agent.clone(),
        ))),
        RendererBackend::Browserless => {
            let browserless = config.browserless.as_ref().ok_or_else(|| {
                RenderError::Network("browserless renderer selected but not configured".to_string())
            })?;
            Ok(Arc::new(BrowserlessRenderer::new(browserless, config.timeout())?))
        }
    }
}
