//! Watch-page and channel-page parsing.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::extractor::ExtractorChain;
use super::parse::{parse_publish_age, parse_view_count, RunClock};
use super::types::{FetchErrorKind, PageError};
use crate::video::{VideoDraft, VideoRef};

/// Markers of anti-automation interstitials.
const BLOCK_MARKERS: &[&str] = &[
    "unusual traffic from your computer network",
    "/sorry/index",
    "g-recaptcha",
    "confirm you\u{2019}re not a bot",
    "confirm you're not a bot",
];

/// Playability statuses of videos that cannot be watched.
const UNAVAILABLE_STATUSES: &[&str] = &["ERROR", "UNPLAYABLE", "LOGIN_REQUIRED"];

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

static TITLE_META_RE: Lazy<Regex> = Lazy::new(|| re(r#"<meta\s+name="title"\s+content="([^"]*)""#));
static OG_TITLE_RE: Lazy<Regex> = Lazy::new(|| re(r#"<meta\s+property="og:title"\s+content="([^"]*)""#));
static TITLE_TAG_RE: Lazy<Regex> = Lazy::new(|| re(r"<title>([^<]*)</title>"));
static INTERACTION_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| re(r#"itemprop="interactionCount"\s+content="(\d+)""#));
static VIEW_COUNT_JSON_RE: Lazy<Regex> = Lazy::new(|| re(r#""viewCount"\s*:\s*"(\d+)""#));
static VIEW_COUNT_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| re(r#""viewCount"\s*:\s*\{\s*"simpleText"\s*:\s*"([^"]+)""#));
static DATE_META_RE: Lazy<Regex> =
    Lazy::new(|| re(r#"itemprop="(?:datePublished|uploadDate)"\s+content="([^"]+)""#));
static PUBLISH_DATE_JSON_RE: Lazy<Regex> =
    Lazy::new(|| re(r#""(?:publishDate|uploadDate)"\s*:\s*"([^"]+)""#));
static DATE_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| re(r#""dateText"\s*:\s*\{\s*"simpleText"\s*:\s*"([^"]+)""#));
static THUMBNAIL_LINK_RE: Lazy<Regex> =
    Lazy::new(|| re(r#"itemprop="thumbnailUrl"\s+href="([^"]+)""#));
static OG_IMAGE_RE: Lazy<Regex> = Lazy::new(|| re(r#"<meta\s+property="og:image"\s+content="([^"]+)""#));
static PLAYABILITY_RE: Lazy<Regex> =
    Lazy::new(|| re(r#""playabilityStatus"\s*:\s*\{\s*"status"\s*:\s*"([A-Z_]+)""#));

fn first_capture(res: &[&Regex], html: &str) -> Option<String> {
    res.iter()
        .find_map(|re| re.captures(html).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().to_string())
}

/// Decode the handful of HTML entities YouTube emits in attributes.
fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Whether the page is an anti-automation challenge instead of content.
pub fn is_blocked(html: &str) -> bool {
    BLOCK_MARKERS.iter().any(|marker| html.contains(marker))
}

/// Whether the page reports the video as unavailable.
pub fn is_unavailable(html: &str) -> bool {
    PLAYABILITY_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .is_some_and(|status| UNAVAILABLE_STATUSES.contains(&status.as_str()))
}

fn extract_title(html: &str) -> Option<String> {
    let title = first_capture(&[&*TITLE_META_RE, &*OG_TITLE_RE], html).or_else(|| {
        first_capture(&[&*TITLE_TAG_RE], html)
            .map(|t| t.trim().trim_end_matches("- YouTube").trim().to_string())
    })?;
    let title = decode_entities(title.trim());
    (!title.is_empty()).then_some(title)
}

fn extract_views(html: &str) -> Option<u64> {
    first_capture(&[&*INTERACTION_COUNT_RE, &*VIEW_COUNT_JSON_RE], html)
        .and_then(|digits| digits.parse().ok())
        .or_else(|| first_capture(&[&*VIEW_COUNT_TEXT_RE], html).and_then(|t| parse_view_count(&t)))
}

fn extract_age(html: &str, clock: &RunClock) -> Option<u32> {
    [&*DATE_META_RE, &*PUBLISH_DATE_JSON_RE, &*DATE_TEXT_RE]
        .iter()
        .filter_map(|re| re.captures(html).and_then(|caps| caps.get(1)))
        .find_map(|m| parse_publish_age(m.as_str(), clock))
}

fn extract_thumbnail(html: &str) -> Option<String> {
    first_capture(&[&*THUMBNAIL_LINK_RE, &*OG_IMAGE_RE], html).map(|url| decode_entities(&url))
}

/// Parse a rendered watch page into a draft record.
pub fn parse_watch_page(
    html: &str,
    video: &VideoRef,
    clock: &RunClock,
    extractors: &ExtractorChain,
    recommendations_limit: usize,
) -> Result<VideoDraft, PageError> {
    if is_blocked(html) {
        return Err(PageError::new(
            FetchErrorKind::Blocked,
            "anti-automation challenge detected",
        ));
    }
    if is_unavailable(html) {
        return Err(PageError::new(FetchErrorKind::NotFound, "video unavailable"));
    }

    let title = extract_title(html)
        .ok_or_else(|| PageError::new(FetchErrorKind::ParseError, "title not found"))?;
    let view_count = extract_views(html)
        .ok_or_else(|| PageError::new(FetchErrorKind::ParseError, "view count not found"))?;
    let publish_age_days = extract_age(html, clock)
        .ok_or_else(|| PageError::new(FetchErrorKind::ParseError, "publish date not found"))?;

    Ok(VideoDraft {
        video: video.clone(),
        title,
        publish_age_days,
        view_count,
        thumbnail_ref: extract_thumbnail(html),
        recommendations: extractors.extract(html, Some(video), recommendations_limit),
    })
}

/// Parse a channel's videos tab into its most recent uploads.
pub fn parse_channel_page(
    html: &str,
    extractors: &ExtractorChain,
    limit: usize,
) -> Result<Vec<VideoRef>, PageError> {
    if is_blocked(html) {
        return Err(PageError::new(
            FetchErrorKind::Blocked,
            "anti-automation challenge detected",
        ));
    }

    let videos = extractors.extract(html, None, limit);
    if videos.is_empty() {
        return Err(PageError::new(
            FetchErrorKind::ParseError,
            "no videos found on channel page",
        ));
    }
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn clock() -> RunClock {
        RunClock::at(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap())
    }

    fn current() -> VideoRef {
        VideoRef::new("aaaaaaaaaaa").unwrap()
    }

    const MICRODATA_PAGE: &str = r#"<html><head>
        <title>Rust in 100 Seconds - YouTube</title>
        <meta name="title" content="Rust in 100 Seconds &amp; more">
        <meta itemprop="interactionCount" content="1234567">
        <meta itemprop="datePublished" content="2024-03-10">
        <link itemprop="thumbnailUrl" href="https://i.ytimg.com/vi/aaaaaaaaaaa/hqdefault.jpg">
        </head><body><script>var ytInitialData = {"secondaryResults":[
        {"compactVideoRenderer":{"videoId":"bbbbbbbbbbb"}},
        {"compactVideoRenderer":{"videoId":"ccccccccccc"}}]};</script></body></html>"#;

    #[test]
    fn test_parse_microdata_page() {
        let draft =
            parse_watch_page(MICRODATA_PAGE, &current(), &clock(), &ExtractorChain::default(), 20)
                .unwrap();

        assert_eq!(draft.title, "Rust in 100 Seconds & more");
        assert_eq!(draft.view_count, 1_234_567);
        assert_eq!(draft.publish_age_days, 5);
        assert_eq!(
            draft.thumbnail_ref.as_deref(),
            Some("https://i.ytimg.com/vi/aaaaaaaaaaa/hqdefault.jpg")
        );
        let recs: Vec<&str> = draft.recommendations.iter().map(VideoRef::as_str).collect();
        assert_eq!(recs, vec!["bbbbbbbbbbb", "ccccccccccc"]);
    }

    #[test]
    fn test_parse_json_only_page() {
        let html = r#"<title>Some talk - YouTube</title>
            {"videoDetails":{"viewCount":{"simpleText":"1.2M views"}}}
            {"dateText":{"simpleText":"3 weeks ago"}}
            <meta property="og:image" content="https://i.ytimg.com/vi/x/maxres.jpg">"#;
        let draft =
            parse_watch_page(html, &current(), &clock(), &ExtractorChain::default(), 20).unwrap();

        assert_eq!(draft.title, "Some talk");
        assert_eq!(draft.view_count, 1_200_000);
        assert_eq!(draft.publish_age_days, 21);
        assert!(draft.recommendations.is_empty());
    }

    #[test]
    fn test_blocked_page() {
        let html = r#"<form id="captcha-form"><div class="g-recaptcha"></div></form>"#;
        let err = parse_watch_page(html, &current(), &clock(), &ExtractorChain::default(), 20)
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Blocked);
    }

    #[test]
    fn test_unavailable_page() {
        let html = r#"<title> - YouTube</title>{"playabilityStatus":{"status":"ERROR","reason":"Video unavailable"}}"#;
        let err = parse_watch_page(html, &current(), &clock(), &ExtractorChain::default(), 20)
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::NotFound);
    }

    #[test]
    fn test_missing_fields_are_parse_errors() {
        let no_views = r#"<meta name="title" content="T"><meta itemprop="datePublished" content="2024-03-10">"#;
        let err = parse_watch_page(no_views, &current(), &clock(), &ExtractorChain::default(), 20)
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::ParseError);
        assert!(err.message.contains("view count"));

        let no_date = r#"<meta name="title" content="T"><meta itemprop="interactionCount" content="5">"#;
        let err = parse_watch_page(no_date, &current(), &clock(), &ExtractorChain::default(), 20)
            .unwrap_err();
        assert!(err.message.contains("publish date"));
    }

    #[test]
    fn test_channel_page() {
        let html = r#"{"videoRenderer":{"videoId":"ddddddddddd"}}{"videoRenderer":{"videoId":"eeeeeeeeeee"}}{"videoRenderer":{"videoId":"fffffffffff"}}"#;
        let videos = parse_channel_page(html, &ExtractorChain::channel_page(), 2).unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].as_str(), "ddddddddddd");

        let err = parse_channel_page("<html></html>", &ExtractorChain::channel_page(), 2)
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::ParseError);
    }
}
