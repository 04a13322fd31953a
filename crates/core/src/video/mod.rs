//! Video identity: canonical refs, seed classification and crawl records.

mod links;
mod types;

pub use links::{parse_seed, parse_video_url};
pub use types::{SeedTarget, VideoDraft, VideoRecord, VideoRef, WATCH_URL_PREFIX};

use thiserror::Error;

/// Errors from parsing video or channel URLs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VideoUrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("not a YouTube URL: {0}")]
    NotYouTube(String),

    #[error("no video id in URL: {0}")]
    NoVideoId(String),

    #[error("invalid video id: {0}")]
    InvalidId(String),
}
