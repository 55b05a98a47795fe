use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::llm::{CompletionOptions, LlmClient, Message};

use super::LearningPathRanker;
use super::extract::extract_structured;
use super::prompts::{RANKER_SYSTEM_PROMPT, ranker_user_prompt};

/// Learning-path ranker backed by a chat-completions model
#[derive(Debug, Clone)]
pub struct LlmRanker {
    client: LlmClient,
    options: CompletionOptions,
    max_links: usize,
}

impl LlmRanker {
    pub fn new(client: LlmClient, options: CompletionOptions, max_links: usize) -> Self {
        Self {
            client,
            options,
            max_links,
        }
    }
}

#[async_trait]
impl LearningPathRanker for LlmRanker {
    async fn rank(&self, topic: &str, links: &[String], context: &str) -> Result<Vec<String>> {
        if links.is_empty() {
            return Err(Error::GenerationFailed(format!(
                "no candidate links for '{}'",
                topic
            )));
        }

        let links_json = serde_json::to_string(links)?;
        let messages = vec![
            Message::system(RANKER_SYSTEM_PROMPT),
            Message::user(ranker_user_prompt(topic, context, &links_json, self.max_links)),
        ];

        let response = self
            .client
            .complete_with_fallback(messages, self.options)
            .await?;
        debug!(topic = %topic, raw = %response.content, "Ranker response received");

        let ranked = parse_ranked(&response.content, self.max_links)?;
        info!(topic = %topic, count = ranked.len(), "Learning path ranked");
        Ok(ranked)
    }
}

/// Accept a bare array, or an object whose first list-valued field holds
/// the array. Non-string entries are dropped and the result is truncated
/// to `max_links`.
pub fn parse_ranked(content: &str, max_links: usize) -> Result<Vec<String>> {
    let value = extract_structured(content)
        .ok_or_else(|| Error::GenerationFailed("ranker response was not JSON".to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .find_map(|(key, value)| match value {
                Value::Array(items) => {
                    debug!(key = %key, "Using list field from ranker response");
                    Some(items)
                }
                _ => None,
            })
            .ok_or_else(|| {
                Error::GenerationFailed("ranker response object holds no list".to_string())
            })?,
        _ => {
            return Err(Error::GenerationFailed(
                "ranker response was not a list".to_string(),
            ));
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(title) => Some(title),
            _ => None,
        })
        .take(max_links)
        .collect())
}
