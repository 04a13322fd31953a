//! Extraction of recommended videos from rendered pages.
//!
//! YouTube has shipped several watch-page layouts; each extractor knows one
//! of them. [`ExtractorChain`] tries them in order and uses the first one
//! that finds anything.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashSet;

use crate::video::VideoRef;

/// Finds recommended video ids in a page, in page order.
pub trait RecommendationExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw ids as they appear; may contain duplicates and the current video.
    fn extract(&self, html: &str) -> Vec<VideoRef>;
}

fn collect_ids(re: &Regex, html: &str) -> Vec<VideoRef> {
    re.captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| VideoRef::new(m.as_str()).ok())
        .collect()
}

static COMPACT_RENDERER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""compactVideoRenderer"\s*:\s*\{\s*"videoId"\s*:\s*"([A-Za-z0-9_-]{11})""#).unwrap()
});

/// Sidebar entries of the classic layout (`compactVideoRenderer`).
pub struct CompactRendererExtractor;

impl RecommendationExtractor for CompactRendererExtractor {
    fn name(&self) -> &'static str {
        "compact_video_renderer"
    }

    fn extract(&self, html: &str) -> Vec<VideoRef> {
        collect_ids(&COMPACT_RENDERER_RE, html)
    }
}

static LOCKUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#""contentId"\s*:\s*"([A-Za-z0-9_-]{11})"\s*,\s*"contentType"\s*:\s*"LOCKUP_CONTENT_TYPE_VIDEO""#,
    )
    .unwrap()
});

/// Sidebar entries of the view-model layout (`lockupViewModel`).
pub struct LockupViewModelExtractor;

impl RecommendationExtractor for LockupViewModelExtractor {
    fn name(&self) -> &'static str {
        "lockup_view_model"
    }

    fn extract(&self, html: &str) -> Vec<VideoRef> {
        collect_ids(&LOCKUP_RE, html)
    }
}

static WATCH_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:href="|"url"\s*:\s*")/watch\?v=([A-Za-z0-9_-]{11})"#).unwrap()
});

/// Any `/watch?v=` link on the page. Last resort for unknown layouts.
///
/// Links that belong to a playlist or a live stream are skipped.
pub struct WatchLinkExtractor;

impl RecommendationExtractor for WatchLinkExtractor {
    fn name(&self) -> &'static str {
        "watch_links"
    }

    fn extract(&self, html: &str) -> Vec<VideoRef> {
        WATCH_LINK_RE
            .captures_iter(html)
            .filter(|caps| {
                let tail_start = caps.get(0).map(|m| m.end()).unwrap_or(0);
                let tail = &html[tail_start..];
                let tail = &tail[..tail.find('"').unwrap_or(tail.len())];
                !is_playlist_or_live(tail)
            })
            .filter_map(|caps| caps.get(1))
            .filter_map(|m| VideoRef::new(m.as_str()).ok())
            .collect()
    }
}

/// Whether the query after a watch link's id marks a playlist entry or a
/// live stream (`&list=...`, `&pp=live`, `&live=1`).
fn is_playlist_or_live(query: &str) -> bool {
    query
        .split('&')
        .map(|pair| pair.strip_prefix("amp;").unwrap_or(pair))
        .any(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            key == "list" || key == "live" || value == "live"
        })
}

static CHANNEL_VIDEO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""videoRenderer"\s*:\s*\{\s*"videoId"\s*:\s*"([A-Za-z0-9_-]{11})""#).unwrap()
});

/// Uploads listed on a channel's videos tab (`videoRenderer`).
pub struct ChannelVideosExtractor;

impl RecommendationExtractor for ChannelVideosExtractor {
    fn name(&self) -> &'static str {
        "channel_videos"
    }

    fn extract(&self, html: &str) -> Vec<VideoRef> {
        collect_ids(&CHANNEL_VIDEO_RE, html)
    }
}

/// Ordered fallback over several extractors.
pub struct ExtractorChain {
    extractors: Vec<Box<dyn RecommendationExtractor>>,
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Box<dyn RecommendationExtractor>>) -> Self {
        Self { extractors }
    }

    /// Extractors for watch-page recommendations, newest layout last.
    pub fn watch_page() -> Self {
        Self::new(vec![
            Box::new(CompactRendererExtractor),
            Box::new(LockupViewModelExtractor),
            Box::new(WatchLinkExtractor),
        ])
    }

    /// Extractors for a channel's uploads.
    pub fn channel_page() -> Self {
        Self::new(vec![Box::new(ChannelVideosExtractor), Box::new(WatchLinkExtractor)])
    }

    /// Run the chain, returning at most `limit` distinct refs other than `exclude`.
    ///
    /// The first extractor that yields at least one usable ref wins; later
    /// extractors are not consulted.
    pub fn extract(&self, html: &str, exclude: Option<&VideoRef>, limit: usize) -> Vec<VideoRef> {
        for extractor in &self.extractors {
            let mut seen = HashSet::new();
            let found: Vec<VideoRef> = extractor
                .extract(html)
                .into_iter()
                .filter(|video| Some(video) != exclude)
                .filter(|video| seen.insert(video.clone()))
                .take(limit)
                .collect();

            if !found.is_empty() {
                tracing::trace!(extractor = extractor.name(), count = found.len(), "Extracted videos");
                return found;
            }
        }
        Vec::new()
    }
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::watch_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(refs: &[VideoRef]) -> Vec<&str> {
        refs.iter().map(VideoRef::as_str).collect()
    }

    #[test]
    fn test_compact_renderer() {
        let html = r#"{"compactVideoRenderer":{"videoId":"aaaaaaaaaaa","title":{}}},{"compactVideoRenderer": {"videoId": "bbbbbbbbbbb"}}"#;
        assert_eq!(
            ids(&CompactRendererExtractor.extract(html)),
            vec!["aaaaaaaaaaa", "bbbbbbbbbbb"]
        );
    }

    #[test]
    fn test_lockup_view_model() {
        let html = r#"{"lockupViewModel":{"contentImage":{},"contentId":"ccccccccccc","contentType":"LOCKUP_CONTENT_TYPE_VIDEO"}},{"lockupViewModel":{"contentId":"PLxxxxxxxxx","contentType":"LOCKUP_CONTENT_TYPE_PLAYLIST"}}"#;
        assert_eq!(ids(&LockupViewModelExtractor.extract(html)), vec!["ccccccccccc"]);
    }

    #[test]
    fn test_watch_links_skip_playlists_and_live() {
        let html = r#"
            <a href="/watch?v=ddddddddddd">one</a>
            <a href="/watch?v=eeeeeeeeeee&list=PL123">playlist</a>
            <a href="/watch?v=fffffffffff&pp=live">live</a>
            <a href="/watch?v=hhhhhhhhhhh&amp;list=RD1&amp;index=2">mix</a>
            "url":"/watch?v=ggggggggggg"
        "#;
        assert_eq!(
            ids(&WatchLinkExtractor.extract(html)),
            vec!["ddddddddddd", "ggggggggggg"]
        );
    }

    #[test]
    fn test_watch_links_keep_unrelated_params() {
        let html = r#"
            <a href="/watch?v=abcdefghijk&feature=deliver">one</a>
            <a href="/watch?v=bbbbbbbbbbb&t=42s&pp=oliveoil">two</a>
        "#;
        assert_eq!(
            ids(&WatchLinkExtractor.extract(html)),
            vec!["abcdefghijk", "bbbbbbbbbbb"]
        );
    }

    #[test]
    fn test_chain_prefers_first_match_and_dedupes() {
        let current = VideoRef::new("aaaaaaaaaaa").unwrap();
        let html = r#"
            {"compactVideoRenderer":{"videoId":"aaaaaaaaaaa"}}
            {"compactVideoRenderer":{"videoId":"bbbbbbbbbbb"}}
            {"compactVideoRenderer":{"videoId":"bbbbbbbbbbb"}}
            {"compactVideoRenderer":{"videoId":"ccccccccccc"}}
            <a href="/watch?v=zzzzzzzzzzz">
        "#;
        let found = ExtractorChain::watch_page().extract(html, Some(&current), 10);
        assert_eq!(ids(&found), vec!["bbbbbbbbbbb", "ccccccccccc"]);
    }

    #[test]
    fn test_chain_falls_back() {
        let html = r#"<a href="/watch?v=zzzzzzzzzzz">"#;
        let found = ExtractorChain::watch_page().extract(html, None, 10);
        assert_eq!(ids(&found), vec!["zzzzzzzzzzz"]);
    }

    #[test]
    fn test_chain_respects_limit() {
        let html: String = (0..5)
            .map(|i| format!(r#"{{"compactVideoRenderer":{{"videoId":"video{:06}"}}}}"#, i))
            .collect();
        let found = ExtractorChain::watch_page().extract(&html, None, 3);
        assert_eq!(ids(&found), vec!["video000000", "video000001", "video000002"]);
    }

    #[test]
    fn test_channel_page() {
        let html = r#"{"richItemRenderer":{"content":{"videoRenderer":{"videoId":"hhhhhhhhhhh"}}}}"#;
        let found = ExtractorChain::channel_page().extract(html, None, 5);
        assert_eq!(ids(&found), vec!["hhhhhhhhhhh"]);
    }
}
