//! URL normalization for videos and channels.

use url::Url;

use super::{SeedTarget, VideoRef, VideoUrlError};

const BASE_URL: &str = "https://www.youtube.com";

/// Path prefixes that carry the video id as the next segment.
const ID_PATH_PREFIXES: &[&str] = &["shorts", "embed", "live", "v", "e"];

/// Path prefixes that identify a channel.
const CHANNEL_PATH_PREFIXES: &[&str] = &["channel", "c", "user"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    YouTube,
    Short,
}

/// Normalize any URL form of a video to its [`VideoRef`].
///
/// Accepts `watch?v=` links on any YouTube host, `youtu.be` short links,
/// `/shorts/`, `/embed/`, `/live/` and `/v/` paths, scheme-less input,
/// relative `/watch?v=` links and bare ids. Extra query parameters and
/// fragments never affect the result.
pub fn parse_video_url(input: &str) -> Result<VideoRef, VideoUrlError> {
    let trimmed = input.trim();
    if VideoRef::is_valid_id(trimmed) {
        return VideoRef::new(trimmed);
    }

    let url = to_url(trimmed)?;
    match host_of(&url) {
        Some(Host::Short) => {
            let id = first_segments(&url).into_iter().next().unwrap_or_default();
            VideoRef::new(id).map_err(|_| VideoUrlError::NoVideoId(input.to_string()))
        }
        Some(Host::YouTube) => {
            video_id_on_main_host(&url).ok_or_else(|| VideoUrlError::NoVideoId(input.to_string()))
        }
        None => Err(VideoUrlError::NotYouTube(input.to_string())),
    }
}

/// Classify a seed URL as a single video or a channel.
///
/// Channel URLs (`/channel/<id>`, `/c/<name>`, `/user/<name>`, `/@handle`,
/// with or without a trailing tab like `/featured`) are normalized to the
/// channel's `/videos` tab.
pub fn parse_seed(input: &str) -> Result<SeedTarget, VideoUrlError> {
    if let Ok(video) = parse_video_url(input) {
        return Ok(SeedTarget::Video(video));
    }

    let url = to_url(input.trim())?;
    if host_of(&url) != Some(Host::YouTube) {
        return Err(VideoUrlError::NotYouTube(input.to_string()));
    }

    let segments = first_segments(&url);
    match segments.as_slice() {
        [handle, ..] if handle.starts_with('@') && handle.len() > 1 => {
            Ok(SeedTarget::Channel(format!("{}/{}/videos", BASE_URL, handle)))
        }
        [kind, name, ..] if CHANNEL_PATH_PREFIXES.contains(&kind.as_str()) && !name.is_empty() => {
            Ok(SeedTarget::Channel(format!("{}/{}/{}/videos", BASE_URL, kind, name)))
        }
        _ => Err(VideoUrlError::NoVideoId(input.to_string())),
    }
}

fn to_url(trimmed: &str) -> Result<Url, VideoUrlError> {
    if trimmed.is_empty() {
        return Err(VideoUrlError::Empty);
    }

    let parsed = if trimmed.starts_with('/') {
        Url::parse(BASE_URL).and_then(|base| base.join(trimmed))
    } else if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("https://{}", trimmed))
    };

    parsed.map_err(|_| VideoUrlError::InvalidUrl(trimmed.to_string()))
}

fn host_of(url: &Url) -> Option<Host> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .or_else(|| host.strip_prefix("music."))
        .unwrap_or(&host);

    match host {
        "youtube.com" | "youtube-nocookie.com" => Some(Host::YouTube),
        "youtu.be" => Some(Host::Short),
        _ => None,
    }
}

fn first_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn video_id_on_main_host(url: &Url) -> Option<VideoRef> {
    let segments = first_segments(url);
    match segments.first().map(String::as_str) {
        Some("watch") => url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .and_then(|(_, value)| VideoRef::new(value.into_owned()).ok()),
        Some(prefix) if ID_PATH_PREFIXES.contains(&prefix) => segments
            .get(1)
            .and_then(|id| VideoRef::new(id.clone()).ok()),
        _ => None,
    }
}
