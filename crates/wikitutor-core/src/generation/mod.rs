//! Generation services
//!
//! Leveled summaries and learning-path ranking, produced by a language model
//! and recovered from its output with [`extract_structured`].

pub mod extract;
pub mod prompts;
mod ranker;
mod summarizer;

use async_trait::async_trait;

use crate::domain::topic::Summaries;
use crate::error::{Error, Result};

pub use extract::extract_structured;
pub use ranker::{LlmRanker, parse_ranked};
pub use summarizer::{LlmSummarizer, parse_summaries};

/// Produces the three leveled summaries of an article in one call
#[async_trait]
pub trait SummarizationService: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<Summaries>;
}

/// Orders candidate links into a learning path
#[async_trait]
pub trait LearningPathRanker: Send + Sync {
    /// `context` is a short summary of the topic; it may be empty.
    async fn rank(&self, topic: &str, links: &[String], context: &str) -> Result<Vec<String>>;
}

/// Stand-in for both services when no API key is configured. Every call
/// fails, so artifacts that need generation come back unavailable while
/// lookups that only need the knowledge source keep working.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

impl Unconfigured {
    fn error() -> Error {
        Error::LLMError(
            "no API key set; export WIKITUTOR_API_KEY or OPENROUTER_API_KEY".to_string(),
        )
    }
}

#[async_trait]
impl SummarizationService for Unconfigured {
    async fn summarize(&self, _text: &str) -> Result<Summaries> {
        Err(Self::error())
    }
}

#[async_trait]
impl LearningPathRanker for Unconfigured {
    async fn rank(&self, _topic: &str, _links: &[String], _context: &str) -> Result<Vec<String>> {
        Err(Self::error())
    }
}
