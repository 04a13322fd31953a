//! Crawl pipeline implementation.
//!
//! Drives one run through the state machine:
//! - Init: validation, proxy check, channel resolution, seeding
//! - Crawling: bounded concurrent fetches, results applied in dequeue order
//! - Classifying: bounded concurrent relevance judgments
//! - Ranked/Done: ordering and the final report

use chrono::Utc;
use futures::stream::{self, FuturesOrdered, StreamExt};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::config::RunLimits;
use super::rank::rank;
use super::stop::StopSignal;
use super::types::{
    CrawlStats, CrawlTermination, Exclusion, PipelineError, RankedRecord, RunReport, RunRequest,
    RunState, VideoFailure,
};
use crate::classifier::{ReferenceTopics, RelevanceClassifier, RelevanceResult};
use crate::fetcher::{FetchFailure, RunClock, VideoFetcher};
use crate::filter::{evaluate, FilterCriteria};
use crate::frontier::{Frontier, FrontierEntry};
use crate::metrics;
use crate::video::{parse_seed, SeedTarget, VideoDraft, VideoRecord, VideoRef};

const NOT_CONFIGURED: &str = "relevance classification not configured";
const SKIPPED_STOPPED: &str = "classification skipped: run stopped";

/// Validated run input.
struct Plan {
    targets: Vec<SeedTarget>,
    criteria: FilterCriteria,
    topics: Option<ReferenceTopics>,
    limits: RunLimits,
    clock: RunClock,
}

/// Mutable state accumulated over one run.
struct Progress {
    run_id: Uuid,
    started_at: chrono::DateTime<Utc>,
    timer: Instant,
    state: RunState,
    kept: Vec<VideoRecord>,
    excluded: Vec<Exclusion>,
    failures: Vec<VideoFailure>,
    stats: CrawlStats,
    termination: Option<CrawlTermination>,
}

impl Progress {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            timer: Instant::now(),
            state: RunState::Init,
            kept: Vec::new(),
            excluded: Vec::new(),
            failures: Vec::new(),
            stats: CrawlStats::default(),
            termination: None,
        }
    }

    fn enter(&mut self, state: RunState) {
        debug!(from = self.state.as_str(), to = state.as_str(), "Run state transition");
        self.state = state;
    }

    fn record_failure(&mut self, video: Option<VideoRef>, failure: &FetchFailure) {
        self.stats.failed += 1;
        self.failures.push(VideoFailure::from_fetch(video, failure));
    }

    fn abort(mut self, reason: PipelineError, frontier: Option<&Frontier>) -> RunReport {
        error!(state = self.state.as_str(), "Run aborted: {}", reason);
        self.enter(RunState::Aborted);
        if let Some(frontier) = frontier {
            self.stats.frontier = frontier.stats();
        }
        self.finish(Vec::new(), Some(reason))
    }

    fn finish(self, records: Vec<RankedRecord>, abort_reason: Option<PipelineError>) -> RunReport {
        metrics::RUN_DURATION
            .with_label_values(&[self.state.as_str()])
            .observe(self.timer.elapsed().as_secs_f64());

        RunReport {
            run_id: self.run_id,
            state: self.state,
            abort_reason,
            termination: self.termination,
            records,
            excluded: self.excluded,
            failures: self.failures,
            stats: self.stats,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Runs crawls: seeds to ranked, relevance-scored videos.
///
/// The fetcher (and the proxy pool behind it) is shared across runs; the
/// frontier, records and report belong to a single run.
pub struct CrawlPipeline {
    fetcher: Arc<VideoFetcher>,
    classifier: Option<Arc<RelevanceClassifier>>,
}

impl CrawlPipeline {
    pub fn new(fetcher: Arc<VideoFetcher>) -> Self {
        Self {
            fetcher,
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<RelevanceClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn fetcher(&self) -> &Arc<VideoFetcher> {
        &self.fetcher
    }

    /// Execute one run to completion (or abort).
    ///
    /// Never fails: problems end up in the report, either as per-video
    /// failures or as an abort reason.
    pub async fn run(&self, request: RunRequest, stop: StopSignal) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.execute(run_id, request, stop).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, request: RunRequest, stop: StopSignal) -> RunReport {
        let mut progress = Progress::new(run_id);
        info!(seeds = request.seeds.len(), "Starting crawl run");

        // ---------------------------------------------------------------- Init
        let plan = match self.plan(&request) {
            Ok(plan) => plan,
            Err(e) => return progress.abort(e, None),
        };

        let frontier = Frontier::new(plan.limits.frontier_limits());
        let seeds = self.resolve_seeds(&plan, &mut progress, &stop).await;
        progress.stats.seeds = frontier.seed(seeds);
        if progress.stats.seeds == 0 {
            let reason = PipelineError::Configuration("no seed could be resolved to a video".to_string());
            return progress.abort(reason, Some(&frontier));
        }
        info!(seeds = progress.stats.seeds, "Frontier seeded");

        // ------------------------------------------------------------ Crawling
        progress.enter(RunState::Crawling);
        if let Err(e) = self.crawl(&plan, &frontier, &mut progress, &stop).await {
            return progress.abort(e, Some(&frontier));
        }
        progress.stats.frontier = frontier.stats();
        info!(
            termination = ?progress.termination,
            fetched = progress.stats.fetched,
            kept = progress.stats.kept,
            excluded = progress.stats.excluded,
            failed = progress.stats.failed,
            "Crawl finished"
        );

        // --------------------------------------------------------- Classifying
        progress.enter(RunState::Classifying);
        let kept = std::mem::take(&mut progress.kept);
        let relevance = self.classify(&kept, plan.topics.as_ref(), &stop).await;
        progress.stats.judged = relevance.iter().filter(|r| r.score.is_some()).count();
        progress.stats.unknown = relevance.len() - progress.stats.judged;

        // -------------------------------------------------------------- Ranked
        progress.enter(RunState::Ranked);
        let records = rank(kept.into_iter().zip(relevance).collect());
        metrics::RECORDS_RANKED.inc_by(records.len() as u64);

        progress.enter(RunState::Done);
        info!(
            records = records.len(),
            judged = progress.stats.judged,
            unknown = progress.stats.unknown,
            "Run complete"
        );
        progress.finish(records, None)
    }

    /// Validate the request and check the proxy pool before any fetch.
    fn plan(&self, request: &RunRequest) -> Result<Plan, PipelineError> {
        request.limits.validate().map_err(PipelineError::Configuration)?;
        request.criteria.validate().map_err(PipelineError::Configuration)?;

        if request.seeds.is_empty() {
            return Err(PipelineError::Configuration("no seeds given".to_string()));
        }
        let targets = request
            .seeds
            .iter()
            .map(|seed| {
                parse_seed(seed).map_err(|e| {
                    PipelineError::Configuration(format!("invalid seed '{}': {}", seed, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let topics = ReferenceTopics::new(&request.topics);
        if self.classifier.is_some() && topics.is_none() {
            return Err(PipelineError::Configuration(
                "relevance classification needs at least one reference topic".to_string(),
            ));
        }

        let proxies = self.fetcher.proxies();
        if !proxies.is_direct() && proxies.healthy_count() == 0 {
            return Err(PipelineError::ProxyExhaustion(format!(
                "none of {} proxies is healthy",
                proxies.len()
            )));
        }

        Ok(Plan {
            targets,
            criteria: request.criteria.clone(),
            topics,
            limits: request.limits.clone(),
            clock: request
                .reference_time
                .map(RunClock::at)
                .unwrap_or_else(RunClock::capture),
        })
    }

    /// Expand channel seeds into their latest uploads.
    async fn resolve_seeds(&self, plan: &Plan, progress: &mut Progress, stop: &StopSignal) -> Vec<VideoRef> {
        let mut seeds = Vec::new();
        for target in &plan.targets {
            match target {
                SeedTarget::Video(video) => seeds.push(video.clone()),
                SeedTarget::Channel(url) => {
                    if stop.is_stopped() {
                        warn!(channel = %url, "Stopped before resolving channel seed");
                        continue;
                    }
                    match self
                        .fetcher
                        .resolve_channel(url, plan.limits.channel_videos_limit)
                        .await
                    {
                        Ok(videos) => {
                            info!(channel = %url, videos = videos.len(), "Resolved channel seed");
                            seeds.extend(videos);
                        }
                        Err(failure) => {
                            warn!(channel = %url, "Could not resolve channel seed: {}", failure);
                            progress.record_failure(None, &failure);
                        }
                    }
                }
            }
        }
        seeds
    }

    async fn crawl(
        &self,
        plan: &Plan,
        frontier: &Frontier,
        progress: &mut Progress,
        stop: &StopSignal,
    ) -> Result<(), PipelineError> {
        let limits = &plan.limits;
        let deadline = limits.time_budget().map(|budget| Instant::now() + budget);
        let mut in_flight = FuturesOrdered::new();
        let mut consecutive_exhaustions = 0u32;

        loop {
            // Dispatch up to the concurrency limit.
            while progress.termination.is_none() && in_flight.len() < limits.fetch_concurrency {
                if stop.is_stopped() {
                    progress.termination = Some(CrawlTermination::Stopped);
                } else if deadline.is_some_and(|d| Instant::now() >= d) {
                    progress.termination = Some(CrawlTermination::TimeBudget);
                } else if limits.max_videos.is_some_and(|max| progress.stats.dispatched >= max) {
                    if !frontier.is_empty() {
                        progress.termination = Some(CrawlTermination::VideoBudget);
                    }
                    break;
                } else if let Some(entry) = frontier.pop() {
                    progress.stats.dispatched += 1;
                    in_flight.push_back(self.fetch_entry(entry, &plan.clock));
                } else {
                    break;
                }
            }

            match progress.termination {
                Some(CrawlTermination::Stopped) | Some(CrawlTermination::TimeBudget) => {
                    if !in_flight.is_empty() {
                        info!(dropped = in_flight.len(), "Abandoning in-flight fetches");
                    }
                    return Ok(());
                }
                _ => {}
            }

            if in_flight.is_empty() {
                progress.termination.get_or_insert(CrawlTermination::FrontierExhausted);
                return Ok(());
            }

            tokio::select! {
                biased;
                _ = stop.wait() => {
                    progress.termination = Some(CrawlTermination::Stopped);
                }
                _ = sleep_until(deadline) => {
                    progress.termination = Some(CrawlTermination::TimeBudget);
                }
                Some((entry, result)) = in_flight.next() => {
                    match result {
                        Ok(draft) => {
                            consecutive_exhaustions = 0;
                            self.apply(entry, draft, &plan.criteria, frontier, progress);
                        }
                        Err(failure) => {
                            if matches!(failure, FetchFailure::ProxyExhausted { .. }) {
                                consecutive_exhaustions += 1;
                            } else {
                                consecutive_exhaustions = 0;
                            }
                            debug!(video = %entry.video, "Fetch failed: {}", failure);
                            progress.record_failure(Some(entry.video), &failure);

                            if consecutive_exhaustions > limits.max_proxy_exhaustions {
                                return Err(PipelineError::ProxyExhaustion(format!(
                                    "{} consecutive fetches found no usable proxy",
                                    consecutive_exhaustions
                                )));
                            }
                        }
                    }
                }
            }
        }
    }

    async fn fetch_entry(
        &self,
        entry: FrontierEntry,
        clock: &RunClock,
    ) -> (FrontierEntry, Result<VideoDraft, FetchFailure>) {
        let result = self.fetcher.fetch(&entry.video, clock).await;
        (entry, result)
    }

    /// Feed recommendations back to the frontier, then keep or exclude the video.
    fn apply(
        &self,
        entry: FrontierEntry,
        draft: VideoDraft,
        criteria: &FilterCriteria,
        frontier: &Frontier,
        progress: &mut Progress,
    ) {
        progress.stats.fetched += 1;
        for recommended in &draft.recommendations {
            frontier.offer(recommended.clone(), entry.depth, Some(entry.video.clone()));
        }

        match evaluate(&draft, criteria) {
            Ok(()) => {
                debug!(video = %entry.video, depth = entry.depth, "Kept");
                progress.stats.kept += 1;
                progress.kept.push(VideoRecord::from_draft(
                    draft,
                    entry.discovered_from,
                    entry.depth,
                    entry.discovery_index,
                ));
            }
            Err(rejection) => {
                debug!(video = %entry.video, reason = rejection.as_str(), "Excluded");
                progress.stats.excluded += 1;
                progress.excluded.push(Exclusion {
                    url: draft.video.watch_url(),
                    video: draft.video,
                    title: draft.title,
                    rejection,
                });
            }
        }
    }

    /// Judge every kept record, in record order.
    async fn classify(
        &self,
        records: &[VideoRecord],
        topics: Option<&ReferenceTopics>,
        stop: &StopSignal,
    ) -> Vec<RelevanceResult> {
        let (classifier, topics) = match (&self.classifier, topics) {
            (Some(classifier), Some(topics)) => (classifier, topics),
            _ => {
                return records
                    .iter()
                    .map(|r| RelevanceResult::unknown(r.video.clone(), NOT_CONFIGURED))
                    .collect()
            }
        };

        info!(records = records.len(), judge = classifier.judge_name(), "Classifying");

        stream::iter(records)
            .map(|record| async move {
                if stop.is_stopped() {
                    return RelevanceResult::unknown(record.video.clone(), SKIPPED_STOPPED);
                }
                tokio::select! {
                    biased;
                    _ = stop.wait() => RelevanceResult::unknown(record.video.clone(), SKIPPED_STOPPED),
                    result = classifier.classify(record, topics) => match result {
                        Ok(result) => result,
                        Err(e) => {
                            warn!(video = %record.video, "Classification failed: {}", e);
                            RelevanceResult::unknown(
                                record.video.clone(),
                                format!("classification failed: {}", e),
                            )
                        }
                    },
                }
            })
            .buffered(classifier.concurrency())
            .collect()
            .await
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
