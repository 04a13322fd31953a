pub mod classifier;
pub mod config;
pub mod fetcher;
pub mod filter;
pub mod frontier;
pub mod metrics;
pub mod pipeline;
pub mod proxy;
pub mod testing;
pub mod video;

pub use classifier::{
    create_llm_client, ClassifierConfig, LlmJudge, LlmThumbnailReader, ReferenceTopics,
    RelevanceClassifier, RelevanceResult, RelevanceTier,
};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config, ConfigError,
    SanitizedConfig,
};
pub use fetcher::{create_renderer, FetcherConfig, PageRenderer, VideoFetcher};
pub use filter::{evaluate, passes, FilterCriteria, Rejection};
pub use frontier::{Frontier, FrontierLimits, OfferOutcome};
pub use pipeline::{
    CrawlPipeline, PipelineError, RankedRecord, RunLimits, RunReport, RunRequest, RunState,
    StopSignal,
};
pub use proxy::{ProxyPool, ProxyPoolConfig};
pub use video::{parse_seed, parse_video_url, VideoRecord, VideoRef};
