//! Crawl run limits.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::frontier::FrontierLimits;

/// Bounds on one crawl run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunLimits {
    /// Recommendation hops followed from the seeds (default: 2).
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Videos ever accepted into the frontier, seeds included (default: 500).
    #[serde(default = "default_max_frontier_size")]
    pub max_frontier_size: usize,

    /// Stop dispatching fetches after this many videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_videos: Option<usize>,

    /// Wall-clock budget for the crawl phase, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_secs: Option<u64>,

    /// Page fetches in flight at once (default: 4).
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Latest uploads taken from each channel seed (default: 5).
    #[serde(default = "default_channel_videos_limit")]
    pub channel_videos_limit: usize,

    /// Consecutive fetches allowed to find no proxy before the run aborts (default: 3).
    #[serde(default = "default_max_proxy_exhaustions")]
    pub max_proxy_exhaustions: u32,
}

fn default_max_depth() -> u32 {
    2
}

fn default_max_frontier_size() -> usize {
    500
}

fn default_fetch_concurrency() -> usize {
    4
}

fn default_channel_videos_limit() -> usize {
    5
}

fn default_max_proxy_exhaustions() -> u32 {
    3
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_frontier_size: default_max_frontier_size(),
            max_videos: None,
            time_budget_secs: None,
            fetch_concurrency: default_fetch_concurrency(),
            channel_videos_limit: default_channel_videos_limit(),
            max_proxy_exhaustions: default_max_proxy_exhaustions(),
        }
    }
}

impl RunLimits {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_frontier_size == 0 {
            return Err("max_frontier_size must be greater than 0".to_string());
        }
        if self.fetch_concurrency == 0 {
            return Err("fetch_concurrency must be greater than 0".to_string());
        }
        if self.channel_videos_limit == 0 {
            return Err("channel_videos_limit must be greater than 0".to_string());
        }
        if self.max_videos == Some(0) {
            return Err("max_videos must be greater than 0 when set".to_string());
        }
        if self.time_budget_secs == Some(0) {
            return Err("time_budget_secs must be greater than 0 when set".to_string());
        }
        Ok(())
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs.map(Duration::from_secs)
    }

    pub fn frontier_limits(&self) -> FrontierLimits {
        FrontierLimits {
            max_depth: self.max_depth,
            max_frontier_size: self.max_frontier_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = RunLimits::default();
        assert_eq!(limits.max_depth, 2);
        assert_eq!(limits.max_frontier_size, 500);
        assert!(limits.time_budget().is_none());
        assert!(limits.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let limits: RunLimits = toml::from_str(
            r#"
            max_depth = 0
            time_budget_secs = 600
            "#,
        )
        .unwrap();
        assert_eq!(limits.max_depth, 0);
        assert_eq!(limits.time_budget(), Some(Duration::from_secs(600)));
        assert_eq!(limits.fetch_concurrency, 4);
    }

    #[test]
    fn test_validate_rejects_zero_budgets() {
        let limits = RunLimits {
            fetch_concurrency: 0,
            ..Default::default()
        };
        assert!(limits.validate().is_err());

        let limits = RunLimits {
            max_videos: Some(0),
            ..Default::default()
        };
        assert!(limits.validate().is_err());
    }
}
