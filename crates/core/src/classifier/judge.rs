//! LLM-backed relevance judge.
//!
//! Prompts a language model with the video's title (and thumbnail text, when
//! available) and the numbered reference topics, then parses the reply
//! strictly: anything outside the documented shape is a malformed response
//! rather than a guess.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::llm::{CompletionRequest, LlmClient};
use super::types::{ClassificationError, Judgment, JudgmentInput, ReferenceTopics};

/// Highest score on the scale the judge is asked to use.
pub const SCORE_SCALE: f32 = 10.0;

/// Judges one video against the reference topics.
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    fn name(&self) -> &str;

    async fn judge(
        &self,
        input: &JudgmentInput,
        topics: &ReferenceTopics,
    ) -> Result<Judgment, ClassificationError>;
}

/// Configuration for the LLM judge.
#[derive(Debug, Clone)]
pub struct LlmJudgeConfig {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmJudgeConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.0,
        }
    }
}

/// Relevance judge backed by an [`LlmClient`].
pub struct LlmJudge {
    client: Arc<dyn LlmClient>,
    config: LlmJudgeConfig,
}

impl LlmJudge {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            config: LlmJudgeConfig::default(),
        }
    }

    pub fn with_config(client: Arc<dyn LlmClient>, config: LlmJudgeConfig) -> Self {
        Self { client, config }
    }

    fn build_system_prompt(&self) -> String {
        r#"You rate how relevant a YouTube video is to a list of reference topics.

SCORING (0 to 10):
- 7-10: the video is clearly about one or more of the topics
- 4-6: the video touches a topic, or is about a closely related subject
- 0-3: the video is not about any of the topics

Judge only from the information given. Do not assume content the title does not suggest.

Respond with JSON only:
{
  "score": 8,
  "matched_topics": [1, 3],
  "explanation": "One short sentence"
}

"matched_topics" lists the numbers of the topics the video matches, and is empty when none match."#
            .to_string()
    }

    fn build_user_prompt(&self, input: &JudgmentInput, topics: &ReferenceTopics) -> String {
        let mut prompt = String::new();

        prompt.push_str("VIDEO:\n");
        prompt.push_str(&format!("Title: {}\n", input.title));
        if let Some(text) = input.thumbnail_text.as_deref().filter(|t| !t.is_empty()) {
            prompt.push_str(&format!("Thumbnail text: {}\n", text));
        }

        prompt.push_str("\nREFERENCE TOPICS:\n");
        for (i, topic) in topics.as_slice().iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, topic));
        }

        prompt.push_str("\nRate the video's relevance to these topics.");
        prompt
    }
}

#[async_trait]
impl RelevanceJudge for LlmJudge {
    fn name(&self) -> &str {
        "llm"
    }

    async fn judge(
        &self,
        input: &JudgmentInput,
        topics: &ReferenceTopics,
    ) -> Result<Judgment, ClassificationError> {
        let request = CompletionRequest::new(self.build_user_prompt(input, topics))
            .with_system(self.build_system_prompt())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);

        let response = self.client.complete(request).await?;
        parse_judgment(&response.text, topics)
    }
}

/// Expected JSON reply.
#[derive(Debug, Deserialize)]
struct JudgmentResponse {
    score: f64,
    #[serde(default)]
    matched_topics: Vec<i64>,
    #[serde(default, alias = "reasoning")]
    explanation: Option<String>,
}

/// Parse a judge reply.
///
/// The reply may wrap the JSON object in prose or a code fence; the object
/// itself must carry a finite score in `[0, 10]` and topic numbers within
/// the topic list. Nothing is clamped.
pub fn parse_judgment(text: &str, topics: &ReferenceTopics) -> Result<Judgment, ClassificationError> {
    let json_str = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(ClassificationError::malformed(format!("no JSON object in reply: {}", text))),
    };

    let parsed: JudgmentResponse = serde_json::from_str(json_str)
        .map_err(|e| ClassificationError::malformed(format!("{} - Response: {}", e, text)))?;

    if !parsed.score.is_finite() || !(0.0..=SCORE_SCALE as f64).contains(&parsed.score) {
        return Err(ClassificationError::malformed(format!(
            "score {} outside 0-{}",
            parsed.score, SCORE_SCALE
        )));
    }

    let mut matched_topics = Vec::with_capacity(parsed.matched_topics.len());
    for index in parsed.matched_topics {
        let topic = usize::try_from(index)
            .ok()
            .and_then(|i| topics.get(i))
            .ok_or_else(|| {
                ClassificationError::malformed(format!(
                    "topic number {} outside 1-{}",
                    index,
                    topics.len()
                ))
            })?;
        if !matched_topics.iter().any(|t: &String| t == topic) {
            matched_topics.push(topic.to_string());
        }
    }

    Ok(Judgment {
        score: (parsed.score / SCORE_SCALE as f64) as f32,
        matched_topics,
        rationale: parsed.explanation.filter(|e| !e.trim().is_empty()),
    })
}
