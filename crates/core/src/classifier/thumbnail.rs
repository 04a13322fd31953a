//! Reading text off video thumbnails.

use async_trait::async_trait;
use std::sync::Arc;

use super::llm::{CompletionRequest, LlmClient};
use super::types::ClassificationError;

/// Extracts visible text from a thumbnail image.
#[async_trait]
pub trait ThumbnailReader: Send + Sync {
    fn name(&self) -> &str;

    /// Text on the image, or an empty string when there is none.
    async fn extract_text(&self, image_url: &str) -> Result<String, ClassificationError>;
}

/// Thumbnail reader that asks a vision-capable LLM to transcribe the image.
pub struct LlmThumbnailReader {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
}

const SYSTEM_PROMPT: &str = "You transcribe text from YouTube video thumbnails.";

const USER_PROMPT: &str = "Write out all text visible in this thumbnail. \
Reply with the text only, no commentary. Reply with NONE if there is no text.";

impl LlmThumbnailReader {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            max_tokens: 300,
        }
    }
}

#[async_trait]
impl ThumbnailReader for LlmThumbnailReader {
    fn name(&self) -> &str {
        "llm"
    }

    async fn extract_text(&self, image_url: &str) -> Result<String, ClassificationError> {
        let request = CompletionRequest::new(USER_PROMPT)
            .with_system(SYSTEM_PROMPT)
            .with_image_url(image_url)
            .with_max_tokens(self.max_tokens);

        let response = self.client.complete(request).await?;
        let text = response.text.trim();
        if text.eq_ignore_ascii_case("none") {
            Ok(String::new())
        } else {
            Ok(text.to_string())
        }
    }
}
