//! Relevance classifier.
//!
//! Judges crawled videos against reference topics with a language model,
//! caching well-formed judgments and bounding request throughput.

mod cache;
mod config;
mod judge;
mod llm;
mod rate_limiter;
mod relevance;
mod thumbnail;
mod types;

pub use cache::{CacheError, CachedJudgment, JudgmentCache, MemoryJudgmentCache, SqliteJudgmentCache};
pub use config::{ClassifierConfig, LlmConfig, LlmProvider};
pub use judge::{parse_judgment, LlmJudge, LlmJudgeConfig, RelevanceJudge, SCORE_SCALE};
pub use llm::{
    create_llm_client, AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError,
    LlmUsage, OpenAiClient,
};
pub use rate_limiter::{RequestLimiter, TokenBucket};
pub use relevance::RelevanceClassifier;
pub use thumbnail::{LlmThumbnailReader, ThumbnailReader};
pub use types::{
    ClassificationError, ClassificationErrorKind, Judgment, JudgmentInput, ReferenceTopics,
    RelevanceResult, RelevanceTier,
};
