//! Mock LLM client for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::classifier::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};

/// Mock implementation of the LlmClient trait.
///
/// Replies are taken from a queue in order; once the queue is empty the
/// default response is used, and without one the call fails with a 500.
pub struct MockLlmClient {
    replies: Arc<RwLock<VecDeque<Result<String, LlmError>>>>,
    default_response: Arc<RwLock<Option<String>>>,
    requests: Arc<RwLock<Vec<CompletionRequest>>>,
}

impl std::fmt::Debug for MockLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLlmClient")
            .field("replies", &"<replies>")
            .field("requests", &"<requests>")
            .finish()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(RwLock::new(VecDeque::new())),
            default_response: Arc::new(RwLock::new(None)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Queue a successful reply.
    pub async fn push_response(&self, text: &str) {
        self.replies.write().await.push_back(Ok(text.to_string()));
    }

    /// Queue a failed call.
    pub async fn push_error(&self, error: LlmError) {
        self.replies.write().await.push_back(Err(error));
    }

    /// Reply used once the queue is drained.
    pub async fn set_default_response(&self, text: &str) {
        *self.default_response.write().await = Some(text.to_string());
    }

    /// Get recorded requests.
    pub async fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.write().await.push(request);

        let queued = self.replies.write().await.pop_front();
        let text = match queued {
            Some(reply) => reply?,
            None => self
                .default_response
                .read()
                .await
                .clone()
                .ok_or_else(|| LlmError::Api {
                    status: 500,
                    message: "no mock response queued".to_string(),
                })?,
        };

        Ok(CompletionResponse {
            text,
            usage: LlmUsage::default(),
            model: "mock-model".to_string(),
        })
    }
}
