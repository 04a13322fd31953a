//! Mock page renderer for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{PageRenderer, RenderError};
use crate::proxy::ProxyEndpoint;

/// A recorded render call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRender {
    /// The URL that was rendered.
    pub url: String,
    /// Address of the proxy the request went through; `None` for direct.
    pub proxy: Option<String>,
}

/// Mock implementation of the PageRenderer trait.
///
/// Pages are served by exact URL. Errors queued for a URL are returned
/// first, one per call, before the page itself. URLs with no page
/// configured answer with HTTP 404.
///
/// # Example
///
/// ```rust,ignore
/// use tubewalk_core::testing::{fixtures, MockRenderer};
///
/// let renderer = MockRenderer::new();
/// let video = fixtures::video_id(1);
/// renderer.set_page(&video.watch_url(), fixtures::WatchPage::new(video.clone(), "Title").render(&clock)).await;
/// renderer.push_error(&video.watch_url(), RenderError::Timeout).await;
///
/// // First call times out, second returns the page.
/// ```
pub struct MockRenderer {
    pages: Arc<RwLock<HashMap<String, String>>>,
    errors: Arc<RwLock<HashMap<String, VecDeque<RenderError>>>>,
    calls: Arc<RwLock<Vec<RecordedRender>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl std::fmt::Debug for MockRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRenderer")
            .field("pages", &"<pages>")
            .field("errors", &"<errors>")
            .field("calls", &"<calls>")
            .finish()
    }
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            pages: Arc::new(RwLock::new(HashMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    /// Serve `html` for `url`.
    pub async fn set_page(&self, url: &str, html: impl Into<String>) {
        self.pages.write().await.insert(url.to_string(), html.into());
    }

    /// Queue an error for the next render of `url`.
    pub async fn push_error(&self, url: &str, error: RenderError) {
        self.errors
            .write()
            .await
            .entry(url.to_string())
            .or_default()
            .push_back(error);
    }

    /// Delay every render by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Get recorded render calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedRender> {
        self.calls.read().await.clone()
    }

    /// Number of renders of one URL.
    pub async fn calls_for(&self, url: &str) -> usize {
        self.calls.read().await.iter().filter(|c| c.url == url).count()
    }

    /// Get the number of render calls.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn render(&self, url: &str, proxy: Option<&ProxyEndpoint>) -> Result<String, RenderError> {
        self.calls.write().await.push(RecordedRender {
            url: url.to_string(),
            proxy: proxy.map(|p| p.address.clone()),
        });

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self
            .errors
            .write()
            .await
            .get_mut(url)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        self.pages
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| RenderError::Status {
                status: 404,
                message: format!("no mock page for {}", url),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_errors_served_before_page() {
        let renderer = MockRenderer::new();
        renderer.set_page("u", "<html></html>").await;
        renderer.push_error("u", RenderError::Timeout).await;

        assert_eq!(renderer.render("u", None).await, Err(RenderError::Timeout));
        assert_eq!(renderer.render("u", None).await.unwrap(), "<html></html>");
        assert!(matches!(
            renderer.render("missing", None).await,
            Err(RenderError::Status { status: 404, .. })
        ));
        assert_eq!(renderer.call_count().await, 3);
        assert_eq!(renderer.calls_for("u").await, 2);
    }
}
