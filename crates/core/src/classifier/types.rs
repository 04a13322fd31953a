//! Relevance classification types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

use super::llm::LlmError;
use crate::video::VideoRef;

/// Ordered, non-empty list of topics videos are judged against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReferenceTopics(Vec<String>);

impl ReferenceTopics {
    /// Trim topics and drop blank ones; `None` if nothing remains.
    pub fn new<I, S>(topics: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let topics: Vec<String> = topics
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if topics.is_empty() {
            None
        } else {
            Some(Self(topics))
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 1-based lookup, matching how topics are numbered in prompts.
    pub fn get(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
            .map(String::as_str)
    }

    /// Stable hex digest of the topic list, used as a cache key component.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for topic in &self.0 {
            hasher.update(topic.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Coarse relevance bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceTier {
    Relevant,
    Partial,
    NotRelevant,
    /// No judgment could be made.
    Unknown,
}

impl RelevanceTier {
    /// Bucket a normalized score in `[0, 1]`.
    pub fn from_score(score: f32) -> Self {
        if score >= 0.7 {
            Self::Relevant
        } else if score >= 0.4 {
            Self::Partial
        } else {
            Self::NotRelevant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevant => "relevant",
            Self::Partial => "partial",
            Self::NotRelevant => "not_relevant",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RelevanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the judge is shown about a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgmentInput {
    pub video: VideoRef,
    pub title: String,
    pub thumbnail_text: Option<String>,
}

/// A well-formed judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    /// Normalized to `[0, 1]`.
    pub score: f32,
    /// Topic strings the judge matched, in its order.
    pub matched_topics: Vec<String>,
    pub rationale: Option<String>,
}

/// Relevance of one video to the reference topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceResult {
    pub video: VideoRef,
    /// `None` exactly when `tier` is unknown.
    pub score: Option<f32>,
    pub tier: RelevanceTier,
    pub matched_topics: Vec<String>,
    pub rationale: Option<String>,
    pub from_cache: bool,
}

impl RelevanceResult {
    pub fn judged(video: VideoRef, judgment: Judgment, from_cache: bool) -> Self {
        Self {
            video,
            score: Some(judgment.score),
            tier: RelevanceTier::from_score(judgment.score),
            matched_topics: judgment.matched_topics,
            rationale: judgment.rationale,
            from_cache,
        }
    }

    pub fn unknown(video: VideoRef, rationale: impl Into<String>) -> Self {
        Self {
            video,
            score: None,
            tier: RelevanceTier::Unknown,
            matched_topics: Vec::new(),
            rationale: Some(rationale.into()),
            from_cache: false,
        }
    }
}

/// Why a classification failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationErrorKind {
    RateLimited,
    MalformedResponse,
    /// Transport failure, timeout or a non-rate-limit API error.
    Unavailable,
}

impl ClassificationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::MalformedResponse => "malformed_response",
            Self::Unavailable => "unavailable",
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::MalformedResponse)
    }
}

impl fmt::Display for ClassificationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ClassificationError {
    pub kind: ClassificationErrorKind,
    pub message: String,
}

impl ClassificationError {
    pub fn new(kind: ClassificationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ClassificationErrorKind::MalformedResponse, message)
    }
}

impl From<LlmError> for ClassificationError {
    fn from(err: LlmError) -> Self {
        let kind = match &err {
            // 529 is Anthropic's "overloaded".
            LlmError::Api { status: 429 | 529, .. } => ClassificationErrorKind::RateLimited,
            _ => ClassificationErrorKind::Unavailable,
        };
        Self::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics_trimmed_and_blank_dropped() {
        let topics = ReferenceTopics::new(["  rust ", "", "async"]).unwrap();
        assert_eq!(topics.as_slice(), ["rust", "async"]);
        assert_eq!(topics.get(1), Some("rust"));
        assert_eq!(topics.get(0), None);
        assert_eq!(topics.get(3), None);
        assert!(ReferenceTopics::new(["  "]).is_none());
    }

    #[test]
    fn test_fingerprint_is_order_sensitive_and_stable() {
        let a = ReferenceTopics::new(["rust", "async"]).unwrap();
        let b = ReferenceTopics::new([" rust", "async "]).unwrap();
        let c = ReferenceTopics::new(["async", "rust"]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        // Concatenation must not collide.
        let d = ReferenceTopics::new(["rusta", "sync"]).unwrap();
        assert_ne!(a.fingerprint(), d.fingerprint());
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(RelevanceTier::from_score(0.7), RelevanceTier::Relevant);
        assert_eq!(RelevanceTier::from_score(0.69), RelevanceTier::Partial);
        assert_eq!(RelevanceTier::from_score(0.4), RelevanceTier::Partial);
        assert_eq!(RelevanceTier::from_score(0.39), RelevanceTier::NotRelevant);
        assert_eq!(RelevanceTier::from_score(0.0), RelevanceTier::NotRelevant);
    }

    #[test]
    fn test_unknown_has_no_score() {
        let video = VideoRef::new("dQw4w9WgXcQ").unwrap();
        let result = RelevanceResult::unknown(video, "nope");
        assert_eq!(result.tier, RelevanceTier::Unknown);
        assert!(result.score.is_none());
    }

    #[test]
    fn test_llm_error_mapping() {
        let rate_limited: ClassificationError = LlmError::Api {
            status: 429,
            message: "slow down".to_string(),
        }
        .into();
        assert_eq!(rate_limited.kind, ClassificationErrorKind::RateLimited);

        let overloaded: ClassificationError = LlmError::Api {
            status: 529,
            message: "overloaded".to_string(),
        }
        .into();
        assert_eq!(overloaded.kind, ClassificationErrorKind::RateLimited);

        let down: ClassificationError = LlmError::Http("connection refused".to_string()).into();
        assert_eq!(down.kind, ClassificationErrorKind::Unavailable);
        assert!(down.kind.is_retryable());
        assert!(!ClassificationErrorKind::MalformedResponse.is_retryable());
    }
}
