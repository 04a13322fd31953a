//! Ranking of classified records.

use std::cmp::Ordering;

use super::types::RankedRecord;
use crate::classifier::RelevanceResult;
use crate::video::VideoRecord;

/// Order records by relevance score (unknown last), then view count
/// descending, then discovery order, and number them from 1.
pub fn rank(classified: Vec<(VideoRecord, RelevanceResult)>) -> Vec<RankedRecord> {
    let mut classified = classified;
    classified.sort_by(|(a, ra), (b, rb)| {
        compare_scores(ra.score, rb.score)
            .then_with(|| b.view_count.cmp(&a.view_count))
            .then_with(|| a.discovery_index.cmp(&b.discovery_index))
    });

    classified
        .into_iter()
        .enumerate()
        .map(|(i, (record, relevance))| RankedRecord {
            rank: i + 1,
            record,
            relevance,
        })
        .collect()
}

/// Descending by score, with missing scores after every present one.
fn compare_scores(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
