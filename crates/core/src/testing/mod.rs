//! Testing utilities and mock implementations.
//!
//! Mocks for the page renderer, the LLM client and the relevance judge,
//! plus fixtures that build pages the fetcher understands, so full crawl
//! runs can be exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use tubewalk_core::testing::{fixtures, MockRenderer, StubJudge};
//!
//! let renderer = MockRenderer::new();
//! let judge = StubJudge::new();
//!
//! let seed = fixtures::video_id(1);
//! renderer.set_page(&seed.watch_url(), fixtures::WatchPage::new(seed.clone(), "Seed").render(&clock)).await;
//! judge.set_judgment(&seed, judgment).await;
//! ```

mod mock_llm;
mod mock_renderer;
mod stub_judge;

pub use mock_llm::MockLlmClient;
pub use mock_renderer::{MockRenderer, RecordedRender};
pub use stub_judge::StubJudge;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Duration;

    use crate::fetcher::RunClock;
    use crate::video::VideoRef;

    /// A valid, distinct video id for each `n`.
    pub fn video_id(n: u32) -> VideoRef {
        VideoRef::new(format!("vid{:08}", n)).expect("fixture ids are 11 characters")
    }

    fn escape_attr(text: &str) -> String {
        text.replace('&', "&amp;").replace('"', "&quot;")
    }

    /// Builder for a watch page in the classic microdata layout.
    #[derive(Debug, Clone)]
    pub struct WatchPage {
        video: VideoRef,
        title: String,
        views: u64,
        published_days_ago: u32,
        recommendations: Vec<VideoRef>,
    }

    impl WatchPage {
        /// A page with 100,000 views published a day before the clock.
        pub fn new(video: VideoRef, title: &str) -> Self {
            Self {
                video,
                title: title.to_string(),
                views: 100_000,
                published_days_ago: 1,
                recommendations: Vec::new(),
            }
        }

        pub fn views(mut self, views: u64) -> Self {
            self.views = views;
            self
        }

        pub fn published_days_ago(mut self, days: u32) -> Self {
            self.published_days_ago = days;
            self
        }

        pub fn recommendations(mut self, recommendations: Vec<VideoRef>) -> Self {
            self.recommendations = recommendations;
            self
        }

        /// Render against `clock`, so the parsed age is exactly `published_days_ago`.
        pub fn render(&self, clock: &RunClock) -> String {
            let published = clock.now().date_naive() - Duration::days(self.published_days_ago as i64);
            let sidebar = self
                .recommendations
                .iter()
                .map(|v| format!(r#"{{"compactVideoRenderer":{{"videoId":"{}"}}}}"#, v))
                .collect::<Vec<_>>()
                .join(",");

            format!(
                r#"<html><head>
<title>{title} - YouTube</title>
<meta name="title" content="{title}">
<meta itemprop="interactionCount" content="{views}">
<meta itemprop="datePublished" content="{published}">
<link itemprop="thumbnailUrl" href="https://i.ytimg.com/vi/{id}/hqdefault.jpg">
</head><body>
<script>var ytInitialData = {{"secondaryResults":[{sidebar}]}};</script>
</body></html>"#,
                title = escape_attr(&self.title),
                views = self.views,
                published = published.format("%Y-%m-%d"),
                id = self.video,
                sidebar = sidebar,
            )
        }
    }

    /// An anti-automation interstitial.
    pub fn challenge_page() -> String {
        r#"<html><body><form id="captcha-form" action="/sorry/index">
<div class="g-recaptcha"></div>
<p>Our systems have detected unusual traffic from your computer network.</p>
</form></body></html>"#
            .to_string()
    }

    /// A watch page for a removed video.
    pub fn unavailable_page() -> String {
        r#"<html><head><title> - YouTube</title></head><body>
<script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"ERROR","reason":"Video unavailable"}};</script>
</body></html>"#
            .to_string()
    }

    /// A channel videos tab listing `uploads`, newest first.
    pub fn channel_page(uploads: &[VideoRef]) -> String {
        let items = uploads
            .iter()
            .map(|v| format!(r#"{{"richItemRenderer":{{"content":{{"videoRenderer":{{"videoId":"{}"}}}}}}}}"#, v))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            r#"<html><body><script>var ytInitialData = {{"contents":[{}]}};</script></body></html>"#,
            items
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use crate::fetcher::{parse_watch_page, ExtractorChain, FetchErrorKind, RunClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_watch_page_fixture_parses() {
        let clock = RunClock::at(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap());
        let html = WatchPage::new(video_id(1), "Tom & Jerry")
            .views(42)
            .published_days_ago(9)
            .recommendations(vec![video_id(2), video_id(3)])
            .render(&clock);

        let draft =
            parse_watch_page(&html, &video_id(1), &clock, &ExtractorChain::default(), 20).unwrap();
        assert_eq!(draft.title, "Tom & Jerry");
        assert_eq!(draft.view_count, 42);
        assert_eq!(draft.publish_age_days, 9);
        assert_eq!(draft.recommendations, vec![video_id(2), video_id(3)]);
    }

    #[test]
    fn test_failure_fixtures() {
        let clock = RunClock::capture();
        let chain = ExtractorChain::default();
        let blocked = parse_watch_page(&challenge_page(), &video_id(1), &clock, &chain, 20);
        assert_eq!(blocked.unwrap_err().kind, FetchErrorKind::Blocked);
        let gone = parse_watch_page(&unavailable_page(), &video_id(1), &clock, &chain, 20);
        assert_eq!(gone.unwrap_err().kind, FetchErrorKind::NotFound);
    }
}
