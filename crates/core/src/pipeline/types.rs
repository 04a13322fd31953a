//! Types for crawl runs and their reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::config::RunLimits;
use crate::classifier::RelevanceResult;
use crate::fetcher::{FetchErrorKind, FetchFailure};
use crate::filter::{FilterCriteria, Rejection};
use crate::frontier::FrontierStats;
use crate::video::{VideoRecord, VideoRef};

/// Run state machine.
///
/// ```text
/// Init -> Crawling -> Classifying -> Ranked -> Done
///
/// Any state can move to Aborted.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    Crawling,
    Classifying,
    Ranked,
    Done,
    Aborted,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Crawling => "crawling",
            Self::Classifying => "classifying",
            Self::Ranked => "ranked",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

/// Why a run was aborted.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("proxy exhaustion: {0}")]
    ProxyExhaustion(String),
}

/// Why the crawl phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlTermination {
    FrontierExhausted,
    TimeBudget,
    VideoBudget,
    Stopped,
}

/// Failure category recorded for a video or channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Blocked,
    NotFound,
    ParseError,
    ProxyExhausted,
}

impl From<FetchErrorKind> for FailureKind {
    fn from(kind: FetchErrorKind) -> Self {
        match kind {
            FetchErrorKind::Timeout => Self::Timeout,
            FetchErrorKind::Blocked => Self::Blocked,
            FetchErrorKind::NotFound => Self::NotFound,
            FetchErrorKind::ParseError => Self::ParseError,
        }
    }
}

/// A page that could not be fetched ("could not determine").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFailure {
    /// `None` for channel pages.
    pub video: Option<VideoRef>,
    pub url: String,
    pub kind: FailureKind,
    pub attempts: u32,
    pub message: String,
}

impl VideoFailure {
    pub fn from_fetch(video: Option<VideoRef>, failure: &FetchFailure) -> Self {
        let (kind, message) = match failure {
            FetchFailure::Page { kind, message, .. } => ((*kind).into(), message.clone()),
            FetchFailure::ProxyExhausted { .. } => (FailureKind::ProxyExhausted, failure.to_string()),
        };
        Self {
            video,
            url: failure.url().to_string(),
            kind,
            attempts: failure.attempts(),
            message,
        }
    }
}

/// A fetched video that failed the filter ("does not qualify").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub video: VideoRef,
    pub url: String,
    pub title: String,
    pub rejection: Rejection,
}

/// A kept video with its relevance, in output order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecord {
    /// 1-based position in the ranking.
    pub rank: usize,
    #[serde(flatten)]
    pub record: VideoRecord,
    pub relevance: RelevanceResult,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Distinct videos seeded into the frontier.
    pub seeds: usize,
    pub dispatched: usize,
    pub fetched: usize,
    pub kept: usize,
    pub excluded: usize,
    pub failed: usize,
    pub judged: usize,
    pub unknown: usize,
    pub frontier: FrontierStats,
}

/// Input for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// Video or channel URLs.
    pub seeds: Vec<String>,
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub limits: RunLimits,
    /// Clock publish ages are measured against; now when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<DateTime<Utc>>,
}

impl RunRequest {
    pub fn new(seeds: Vec<String>) -> Self {
        Self {
            seeds,
            criteria: FilterCriteria::default(),
            topics: Vec::new(),
            limits: RunLimits::default(),
            reference_time: None,
        }
    }

    pub fn with_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<PipelineError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<CrawlTermination>,
    /// Ranked output; empty when aborted.
    pub records: Vec<RankedRecord>,
    pub excluded: Vec<Exclusion>,
    pub failures: Vec<VideoFailure>,
    pub stats: CrawlStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn is_aborted(&self) -> bool {
        self.state == RunState::Aborted
    }
}
