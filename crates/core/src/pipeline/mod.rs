//! Crawl pipeline orchestration.
//!
//! A run moves through `Init -> Crawling -> Classifying -> Ranked -> Done`,
//! or to `Aborted` on configuration errors and proxy exhaustion:
//! - **Crawling**: breadth-first over the recommendation graph, with a
//!   bounded number of fetches in flight
//! - **Classifying**: relevance judgments for every record that passed the
//!   filter, with the classifier's own concurrency budget
//! - **Ranked**: score, then views, then discovery order

mod config;
mod rank;
mod runner;
mod stop;
mod types;

pub use config::RunLimits;
pub use rank::rank;
pub use runner::CrawlPipeline;
pub use stop::StopSignal;
pub use types::{
    CrawlStats, CrawlTermination, Exclusion, FailureKind, PipelineError, RankedRecord, RunReport,
    RunRequest, RunState, VideoFailure,
};
