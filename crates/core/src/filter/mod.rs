//! Recency, popularity and title filter.
//!
//! A pure predicate over fetched videos. Records that fail it are still
//! crawled through (their recommendations feed the frontier) but never
//! reach the ranked output.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::video::VideoDraft;

/// Bounds a video must satisfy to be kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Oldest accepted publish age, inclusive (default: 7).
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    /// Fewest accepted views, inclusive (default: 10000).
    #[serde(default = "default_min_views")]
    pub min_views: u64,
    /// Most accepted views, inclusive; unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_views: Option<u64>,
    /// Keyword the title must contain, case-insensitive; any title when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_contains: Option<String>,
}

fn default_max_age_days() -> u32 {
    7
}

fn default_min_views() -> u64 {
    10_000
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            min_views: default_min_views(),
            max_views: None,
            title_contains: None,
        }
    }
}

impl FilterCriteria {
    /// Validate the bounds.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max_views) = self.max_views {
            if max_views < self.min_views {
                return Err(format!(
                    "max_views ({}) must not be below min_views ({})",
                    max_views, self.min_views
                ));
            }
        }
        Ok(())
    }
}

/// The first bound a video failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    TooOld { age_days: u32, max_age_days: u32 },
    TooFewViews { views: u64, min_views: u64 },
    TooManyViews { views: u64, max_views: u64 },
    TitleMismatch,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooOld { .. } => "too_old",
            Self::TooFewViews { .. } => "too_few_views",
            Self::TooManyViews { .. } => "too_many_views",
            Self::TitleMismatch => "title_mismatch",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooOld {
                age_days,
                max_age_days,
            } => write!(f, "published {} days ago (limit {})", age_days, max_age_days),
            Self::TooFewViews { views, min_views } => {
                write!(f, "{} views (minimum {})", views, min_views)
            }
            Self::TooManyViews { views, max_views } => {
                write!(f, "{} views (maximum {})", views, max_views)
            }
            Self::TitleMismatch => f.write_str("title does not contain the keyword"),
        }
    }
}

/// Check a video against the criteria, naming the first failing bound.
pub fn evaluate(draft: &VideoDraft, criteria: &FilterCriteria) -> Result<(), Rejection> {
    if draft.publish_age_days > criteria.max_age_days {
        return Err(Rejection::TooOld {
            age_days: draft.publish_age_days,
            max_age_days: criteria.max_age_days,
        });
    }
    if draft.view_count < criteria.min_views {
        return Err(Rejection::TooFewViews {
            views: draft.view_count,
            min_views: criteria.min_views,
        });
    }
    if let Some(max_views) = criteria.max_views {
        if draft.view_count > max_views {
            return Err(Rejection::TooManyViews {
                views: draft.view_count,
                max_views,
            });
        }
    }
    match criteria.title_contains.as_deref().map(str::trim) {
        Some(keyword) if !keyword.is_empty() => {
            if draft.title.to_lowercase().contains(&keyword.to_lowercase()) {
                Ok(())
            } else {
                Err(Rejection::TitleMismatch)
            }
        }
        _ => Ok(()),
    }
}

pub fn passes(draft: &VideoDraft, criteria: &FilterCriteria) -> bool {
    evaluate(draft, criteria).is_ok()
}
