//! Fetcher types and the page renderer abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::proxy::{ProxyEndpoint, ProxyOutcome};

/// Why a single page fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// No usable response in time, or a transient network/server error.
    Timeout,
    /// Anti-automation challenge, CAPTCHA or rate limiting.
    Blocked,
    /// The video is gone, private or otherwise unavailable.
    NotFound,
    /// The page rendered but its structure was not recognized.
    ParseError,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Blocked => "blocked",
            Self::NotFound => "not_found",
            Self::ParseError => "parse_error",
        }
    }

    /// Whether another attempt through a different proxy may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Blocked)
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure of one attempt, before retry handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl PageError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Final failure of a fetch after the retry policy ran out.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("{kind} fetching {url} after {attempts} attempt(s): {message}")]
    Page {
        kind: FetchErrorKind,
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("no proxy available for {url} after {attempts} attempt(s)")]
    ProxyExhausted { url: String, attempts: u32 },
}

impl FetchFailure {
    pub fn url(&self) -> &str {
        match self {
            Self::Page { url, .. } | Self::ProxyExhausted { url, .. } => url,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Page { attempts, .. } | Self::ProxyExhausted { attempts, .. } => *attempts,
        }
    }
}

/// Transport-level errors from a [`PageRenderer`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("render timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("proxy rejected the request: {0}")]
    ProxyRejected(String),

    #[error("network error: {0}")]
    Network(String),
}

impl RenderError {
    /// Map to the fetch error kind and the outcome to report for the proxy.
    pub fn classify(&self) -> (FetchErrorKind, ProxyOutcome) {
        match self {
            Self::Timeout | Self::Network(_) => (FetchErrorKind::Timeout, ProxyOutcome::SoftFailure),
            Self::ProxyRejected(_) => (FetchErrorKind::Blocked, ProxyOutcome::HardFailure),
            Self::Status { status, .. } => match status {
                404 | 410 => (FetchErrorKind::NotFound, ProxyOutcome::Success),
                407 => (FetchErrorKind::Blocked, ProxyOutcome::HardFailure),
                403 | 429 => (FetchErrorKind::Blocked, ProxyOutcome::SoftFailure),
                _ => (FetchErrorKind::Timeout, ProxyOutcome::SoftFailure),
            },
        }
    }
}

/// Renders a page and returns its DOM as HTML.
///
/// Implementations own the transport (plain HTTP, headless browser service)
/// and route the request through `proxy` when one is given.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Backend name for logs (e.g., "http", "browserless").
    fn name(&self) -> &str;

    async fn render(&self, url: &str, proxy: Option<&ProxyEndpoint>) -> Result<String, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(FetchErrorKind::Timeout.is_retryable());
        assert!(FetchErrorKind::Blocked.is_retryable());
        assert!(!FetchErrorKind::NotFound.is_retryable());
        assert!(!FetchErrorKind::ParseError.is_retryable());
    }

    #[test]
    fn test_render_error_classification() {
        let status = |status| RenderError::Status {
            status,
            message: String::new(),
        };

        assert_eq!(
            RenderError::Timeout.classify(),
            (FetchErrorKind::Timeout, ProxyOutcome::SoftFailure)
        );
        assert_eq!(
            status(404).classify(),
            (FetchErrorKind::NotFound, ProxyOutcome::Success)
        );
        assert_eq!(
            status(429).classify(),
            (FetchErrorKind::Blocked, ProxyOutcome::SoftFailure)
        );
        assert_eq!(
            status(407).classify(),
            (FetchErrorKind::Blocked, ProxyOutcome::HardFailure)
        );
        assert_eq!(
            status(503).classify(),
            (FetchErrorKind::Timeout, ProxyOutcome::SoftFailure)
        );
    }

    #[test]
    fn test_failure_display() {
        let failure = FetchFailure::Page {
            kind: FetchErrorKind::Blocked,
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            attempts: 3,
            message: "captcha".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "blocked fetching https://www.youtube.com/watch?v=dQw4w9WgXcQ after 3 attempt(s): captcha"
        );
        assert_eq!(failure.attempts(), 3);
    }
}
