use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::topic::{Summaries, SummaryLevel};
use crate::error::{Error, Result};
use crate::llm::{CompletionOptions, LlmClient, Message};

use super::SummarizationService;
use super::extract::extract_structured;
use super::prompts::{SUMMARY_SYSTEM_PROMPT, summary_user_prompt};

/// Summarization service backed by a chat-completions model
#[derive(Debug, Clone)]
pub struct LlmSummarizer {
    client: LlmClient,
    options: CompletionOptions,
}

impl LlmSummarizer {
    pub fn new(client: LlmClient, options: CompletionOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl SummarizationService for LlmSummarizer {
    async fn summarize(&self, text: &str) -> Result<Summaries> {
        let messages = vec![
            Message::system(SUMMARY_SYSTEM_PROMPT),
            Message::user(summary_user_prompt(text)),
        ];

        let response = self
            .client
            .complete_with_fallback(messages, self.options)
            .await?;
        debug!(model = %response.model, "Summary response received");

        let summaries = parse_summaries(&response.content)?;
        info!(chars = text.len(), "Summaries generated");
        Ok(summaries)
    }
}

/// All three levels must be present as non-empty strings.
pub fn parse_summaries(content: &str) -> Result<Summaries> {
    let value = extract_structured(content)
        .ok_or_else(|| Error::GenerationFailed("summary response was not JSON".to_string()))?;

    let field = |level: SummaryLevel| -> Result<String> {
        match value.get(level.as_str()) {
            Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
            _ => {
                warn!(level = %level, "Summary level missing from response");
                Err(Error::GenerationFailed(format!(
                    "summary response has no usable '{}' text",
                    level
                )))
            }
        }
    };

    Ok(Summaries {
        basic: field(SummaryLevel::Basic)?,
        intermediate: field(SummaryLevel::Intermediate)?,
        advanced: field(SummaryLevel::Advanced)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_response() {
        let content = r#"Here you go:
        {"basic": "Plants make food.", "intermediate": "Chlorophyll absorbs light.", "advanced": "The Calvin cycle fixes CO2.",}"#;
        let summaries = parse_summaries(content).unwrap();
        assert_eq!(summaries.basic, "Plants make food.");
        assert_eq!(summaries.advanced, "The Calvin cycle fixes CO2.");
    }

    #[test]
    fn test_quoted_phrase_in_summary() {
        let content = r#"{"basic": "He called it \"imagination\".", "intermediate": "i", "advanced": "a"}"#;
        let summaries = parse_summaries(content).unwrap();
        assert_eq!(summaries.basic, "He called it \"imagination\".");
    }

    #[test]
    fn test_missing_level_fails() {
        let content = r#"{"basic": "a", "intermediate": "b"}"#;
        let err = parse_summaries(content).unwrap_err();
        assert!(matches!(err, Error::GenerationFailed(ref m) if m.contains("advanced")));
    }

    #[test]
    fn test_empty_or_non_string_level_fails() {
        assert!(parse_summaries(r#"{"basic": "", "intermediate": "b", "advanced": "c"}"#).is_err());
        assert!(parse_summaries(r#"{"basic": 1, "intermediate": "b", "advanced": "c"}"#).is_err());
    }

    #[test]
    fn test_non_json_fails() {
        assert!(matches!(
            parse_summaries("I'm sorry, I can't summarize that."),
            Err(Error::GenerationFailed(_))
        ));
    }
}
