//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Fetching (attempts by outcome, proxy health transitions)
//! - Crawling (frontier offers, run duration)
//! - Classification (results, LLM token usage)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Fetcher
// =============================================================================

/// Watch/channel page fetch attempts by outcome.
pub static FETCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubewalk_fetch_attempts_total", "Total page fetch attempts"),
        &["outcome"], // "success", "timeout", "blocked", "not_found", "parse_error", "no_proxy"
    )
    .unwrap()
});

/// Proxy health transitions by target state.
pub static PROXY_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tubewalk_proxy_transitions_total",
            "Proxy health state transitions",
        ),
        &["state"], // "healthy", "cooling_down", "banned"
    )
    .unwrap()
});

// =============================================================================
// Crawl
// =============================================================================

/// Frontier offers by outcome.
pub static FRONTIER_OFFERS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubewalk_frontier_offers_total", "Recommendations offered to the frontier"),
        &["outcome"], // "queued", "already_seen", "too_deep", "budget_exhausted"
    )
    .unwrap()
});

/// Run duration by final state.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("tubewalk_run_duration_seconds", "Duration of crawl runs")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0]),
        &["state"], // "done", "aborted"
    )
    .unwrap()
});

/// Records emitted in ranked output.
pub static RECORDS_RANKED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("tubewalk_records_ranked_total", "Records emitted in ranked output").unwrap()
});

// =============================================================================
// Classification
// =============================================================================

/// Classification results.
pub static CLASSIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubewalk_classifications_total", "Relevance classifications"),
        &["result"], // "judged", "cache_hit", "rate_limited", "unavailable", "malformed_response"
    )
    .unwrap()
});

/// LLM tokens used.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubewalk_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

/// All core metrics, for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(FETCH_ATTEMPTS.clone()),
        Box::new(PROXY_TRANSITIONS.clone()),
        Box::new(FRONTIER_OFFERS.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(RECORDS_RANKED.clone()),
        Box::new(CLASSIFICATIONS.clone()),
        Box::new(LLM_TOKENS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        FETCH_ATTEMPTS.with_label_values(&["success"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "tubewalk_fetch_attempts_total"));
    }
}
