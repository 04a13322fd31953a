//! Video identity and the records built from fetched watch pages.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::VideoUrlError;

/// Canonical watch URL prefix.
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Normalized YouTube video identifier.
///
/// Always the 11-character id, regardless of which URL form it was parsed
/// from. Two refs are equal exactly when they address the same video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoRef(String);

impl VideoRef {
    /// Length of a YouTube video id.
    pub const ID_LEN: usize = 11;

    /// Validate a bare video id.
    pub fn new(id: impl Into<String>) -> Result<Self, VideoUrlError> {
        let id = id.into();
        if Self::is_valid_id(&id) {
            Ok(Self(id))
        } else {
            Err(VideoUrlError::InvalidId(id))
        }
    }

    /// Whether `candidate` has the shape of a video id.
    pub fn is_valid_id(candidate: &str) -> bool {
        candidate.len() == Self::ID_LEN
            && candidate
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch-page URL for this video.
    pub fn watch_url(&self) -> String {
        format!("{}{}", WATCH_URL_PREFIX, self.0)
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VideoRef {
    type Error = VideoUrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VideoRef> for String {
    fn from(value: VideoRef) -> Self {
        value.0
    }
}

/// What a seed URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedTarget {
    /// A single video.
    Video(VideoRef),
    /// A channel, normalized to its `/videos` tab URL.
    Channel(String),
}

/// Metadata extracted from one successfully parsed watch page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDraft {
    pub video: VideoRef,
    pub title: String,
    /// Whole days between publication and the run's reference clock.
    pub publish_age_days: u32,
    pub view_count: u64,
    pub thumbnail_ref: Option<String>,
    /// Recommended videos in page order, current video and duplicates removed.
    pub recommendations: Vec<VideoRef>,
}

/// A fetched video together with where the crawl found it.
///
/// Built once from a [`VideoDraft`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video: VideoRef,
    pub title: String,
    pub publish_age_days: u32,
    pub view_count: u64,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_ref: Option<String>,
    /// The video whose page recommended this one; `None` for seeds.
    pub discovered_from: Option<VideoRef>,
    /// Recommendation hops from the nearest seed.
    pub depth: u32,
    /// Position in the order the crawl discovered videos.
    pub discovery_index: u64,
}

impl VideoRecord {
    pub fn from_draft(
        draft: VideoDraft,
        discovered_from: Option<VideoRef>,
        depth: u32,
        discovery_index: u64,
    ) -> Self {
        Self {
            source_url: draft.video.watch_url(),
            video: draft.video,
            title: draft.title,
            publish_age_days: draft.publish_age_days,
            view_count: draft.view_count,
            thumbnail_ref: draft.thumbnail_ref,
            discovered_from,
            depth,
            discovery_index,
        }
    }
}
