//! Crawl frontier and dedup store.
//!
//! A FIFO of videos waiting to be fetched plus the set of videos already
//! dequeued. Breadth-first by construction: entries are appended in
//! discovery order and every offer is one hop deeper than its parent.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::metrics;
use crate::video::VideoRef;

/// Traversal bounds for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierLimits {
    /// Deepest hop count accepted; seeds are depth 0.
    pub max_depth: u32,
    /// Most entries ever accepted, seeds included.
    pub max_frontier_size: usize,
}

/// A video waiting in (or just taken from) the frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub video: VideoRef,
    pub depth: u32,
    pub discovered_from: Option<VideoRef>,
    /// Position in acceptance order, starting at 0.
    pub discovery_index: u64,
}

/// What happened to an offered video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferOutcome {
    Queued,
    /// Already fetched or already waiting.
    AlreadySeen,
    TooDeep,
    BudgetExhausted,
}

impl OfferOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::AlreadySeen => "already_seen",
            Self::TooDeep => "too_deep",
            Self::BudgetExhausted => "budget_exhausted",
        }
    }
}

/// Counters describing the frontier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierStats {
    pub queued: usize,
    pub visited: usize,
    pub accepted: usize,
    pub already_seen: usize,
    pub too_deep: usize,
    pub budget_exhausted: usize,
}

#[derive(Default)]
struct FrontierState {
    queue: VecDeque<FrontierEntry>,
    queued: HashSet<VideoRef>,
    visited: HashSet<VideoRef>,
    stats: FrontierStats,
}

/// The frontier of one crawl run.
///
/// All operations take the same lock, so a video moves from queued to
/// visited atomically and is never handed out twice.
pub struct Frontier {
    limits: FrontierLimits,
    state: Mutex<FrontierState>,
}

impl Frontier {
    pub fn new(limits: FrontierLimits) -> Self {
        Self {
            limits,
            state: Mutex::new(FrontierState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn limits(&self) -> FrontierLimits {
        self.limits
    }

    /// Queue seeds at depth 0, returning how many were accepted.
    pub fn seed(&self, videos: impl IntoIterator<Item = VideoRef>) -> usize {
        let mut state = self.lock();
        videos
            .into_iter()
            .filter(|video| self.admit(&mut state, video.clone(), 0, None) == OfferOutcome::Queued)
            .count()
    }

    /// Offer a video recommended by a page at `from_depth`.
    pub fn offer(&self, video: VideoRef, from_depth: u32, discovered_from: Option<VideoRef>) -> OfferOutcome {
        let mut state = self.lock();
        let outcome = self.admit(&mut state, video, from_depth.saturating_add(1), discovered_from);
        metrics::FRONTIER_OFFERS
            .with_label_values(&[outcome.as_str()])
            .inc();
        outcome
    }

    fn admit(
        &self,
        state: &mut FrontierState,
        video: VideoRef,
        depth: u32,
        discovered_from: Option<VideoRef>,
    ) -> OfferOutcome {
        let outcome = if state.visited.contains(&video) || state.queued.contains(&video) {
            OfferOutcome::AlreadySeen
        } else if depth > self.limits.max_depth {
            OfferOutcome::TooDeep
        } else if state.stats.accepted >= self.limits.max_frontier_size {
            OfferOutcome::BudgetExhausted
        } else {
            OfferOutcome::Queued
        };

        match outcome {
            OfferOutcome::Queued => {
                let discovery_index = state.stats.accepted as u64;
                state.stats.accepted += 1;
                state.queued.insert(video.clone());
                state.queue.push_back(FrontierEntry {
                    video,
                    depth,
                    discovered_from,
                    discovery_index,
                });
            }
            OfferOutcome::AlreadySeen => state.stats.already_seen += 1,
            OfferOutcome::TooDeep => state.stats.too_deep += 1,
            OfferOutcome::BudgetExhausted => state.stats.budget_exhausted += 1,
        }
        outcome
    }

    /// Take the oldest waiting entry and mark it visited.
    pub fn pop(&self) -> Option<FrontierEntry> {
        let mut state = self.lock();
        let entry = state.queue.pop_front()?;
        state.queued.remove(&entry.video);
        state.visited.insert(entry.video.clone());
        Some(entry)
    }

    pub fn is_visited(&self, video: &VideoRef) -> bool {
        self.lock().visited.contains(video)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn stats(&self) -> FrontierStats {
        let state = self.lock();
        FrontierStats {
            queued: state.queue.len(),
            visited: state.visited.len(),
            ..state.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::video_id;

    fn frontier(max_depth: u32, max_frontier_size: usize) -> Frontier {
        Frontier::new(FrontierLimits {
            max_depth,
            max_frontier_size,
        })
    }

    #[test]
    fn test_fifo_order_and_depths() {
        let frontier = frontier(3, 100);
        assert_eq!(frontier.seed(vec![video_id(1), video_id(2)]), 2);

        let first = frontier.pop().unwrap();
        assert_eq!(first.video, video_id(1));
        assert_eq!(first.depth, 0);
        assert_eq!(first.discovery_index, 0);

        frontier.offer(video_id(3), first.depth, Some(first.video.clone()));

        let second = frontier.pop().unwrap();
        assert_eq!(second.video, video_id(2));

        let third = frontier.pop().unwrap();
        assert_eq!(third.video, video_id(3));
        assert_eq!(third.depth, 1);
        assert_eq!(third.discovered_from, Some(video_id(1)));
        assert_eq!(third.discovery_index, 2);

        assert!(frontier.pop().is_none());
    }

    #[test]
    fn test_no_duplicates_queued_or_visited() {
        let frontier = frontier(5, 100);
        frontier.seed(vec![video_id(1), video_id(1)]);

        assert_eq!(frontier.offer(video_id(1), 0, None), OfferOutcome::AlreadySeen);
        let entry = frontier.pop().unwrap();
        assert!(frontier.is_visited(&entry.video));

        // Visited videos are not re-queued, even from a cycle.
        assert_eq!(frontier.offer(video_id(1), 3, Some(video_id(9))), OfferOutcome::AlreadySeen);
        assert!(frontier.is_empty());
        assert_eq!(frontier.stats().already_seen, 3);
    }

    #[test]
    fn test_depth_bound() {
        let frontier = frontier(1, 100);
        assert_eq!(frontier.offer(video_id(2), 0, None), OfferOutcome::Queued);
        assert_eq!(frontier.offer(video_id(3), 1, None), OfferOutcome::TooDeep);
    }

    #[test]
    fn test_size_budget_counts_seeds() {
        let frontier = frontier(5, 3);
        assert_eq!(frontier.seed(vec![video_id(1), video_id(2)]), 2);
        assert_eq!(frontier.offer(video_id(3), 0, None), OfferOutcome::Queued);
        assert_eq!(frontier.offer(video_id(4), 0, None), OfferOutcome::BudgetExhausted);

        // Popping does not free budget.
        frontier.pop();
        assert_eq!(frontier.offer(video_id(5), 0, None), OfferOutcome::BudgetExhausted);

        let stats = frontier.stats();
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.visited, 1);
        assert_eq!(stats.budget_exhausted, 2);
    }
}
