//! Stub relevance judge for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::classifier::{
    ClassificationError, Judgment, JudgmentInput, ReferenceTopics, RelevanceJudge,
};
use crate::video::VideoRef;

/// Judge with canned per-video answers.
///
/// Queued errors for a video are returned first, then its judgment. Videos
/// with nothing configured get the default judgment (score 0.5, no topics).
pub struct StubJudge {
    judgments: Arc<RwLock<HashMap<VideoRef, Judgment>>>,
    errors: Arc<RwLock<HashMap<VideoRef, VecDeque<ClassificationError>>>>,
    default_judgment: Arc<RwLock<Judgment>>,
    inputs: Arc<RwLock<Vec<JudgmentInput>>>,
}

impl Default for StubJudge {
    fn default() -> Self {
        Self::new()
    }
}

impl StubJudge {
    pub fn new() -> Self {
        Self {
            judgments: Arc::new(RwLock::new(HashMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            default_judgment: Arc::new(RwLock::new(Judgment {
                score: 0.5,
                matched_topics: Vec::new(),
                rationale: None,
            })),
            inputs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_judgment(&self, video: &VideoRef, judgment: Judgment) {
        self.judgments.write().await.insert(video.clone(), judgment);
    }

    pub async fn set_default_judgment(&self, judgment: Judgment) {
        *self.default_judgment.write().await = judgment;
    }

    /// Queue an error for the next judgment of `video`.
    pub async fn push_error(&self, video: &VideoRef, error: ClassificationError) {
        self.errors
            .write()
            .await
            .entry(video.clone())
            .or_default()
            .push_back(error);
    }

    pub async fn call_count(&self) -> usize {
        self.inputs.read().await.len()
    }

    pub async fn recorded_inputs(&self) -> Vec<JudgmentInput> {
        self.inputs.read().await.clone()
    }
}

#[async_trait]
impl RelevanceJudge for StubJudge {
    fn name(&self) -> &str {
        "stub"
    }

    async fn judge(
        &self,
        input: &JudgmentInput,
        _topics: &ReferenceTopics,
    ) -> Result<Judgment, ClassificationError> {
        self.inputs.write().await.push(input.clone());

        if let Some(error) = self
            .errors
            .write()
            .await
            .get_mut(&input.video)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        if let Some(judgment) = self.judgments.read().await.get(&input.video) {
            return Ok(judgment.clone());
        }
        Ok(self.default_judgment.read().await.clone())
    }
}
