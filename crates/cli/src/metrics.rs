//! Prometheus registry for a crawl run.

use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in tubewalk_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
    registry
});

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubewalk_core::metrics::{FETCH_ATTEMPTS, RECORDS_RANKED};

    #[test]
    fn test_encode_includes_core_metrics() {
        FETCH_ATTEMPTS.with_label_values(&["success"]).inc();
        RECORDS_RANKED.inc();

        let output = encode_metrics();
        assert!(output.contains("tubewalk_fetch_attempts_total"));
        assert!(output.contains("tubewalk_records_ranked_total"));
    }
}
