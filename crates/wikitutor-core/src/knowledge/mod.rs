//! Knowledge source
//!
//! Resolves a raw topic string against the encyclopedia and writes what it
//! finds (canonical mapping, article intro, related links) through both
//! tiers. Resolution only reports success; callers read the results back
//! from the tiers.

pub mod sanitize;
mod source;
mod wikipedia;

use async_trait::async_trait;

use crate::error::Result;

pub use source::WriteThroughSource;
pub use wikipedia::{WikipediaClient, extract_page};

/// A resolved encyclopedia page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Canonical title after redirects
    pub title: String,
    /// Sanitized introductory text, if the page has any
    pub intro: Option<String>,
    /// Related article titles, deduplicated
    pub links: Vec<String>,
}

/// Fetches and parses one encyclopedia page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// `Ok(None)` means the page does not exist
    async fn fetch(&self, topic: &str) -> Result<Option<FetchedPage>>;
}

/// Side-effecting topic resolution
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Resolve `raw_topic` and populate both tiers for the page it names.
    ///
    /// Returns `Ok(false)` when the topic cannot be resolved.
    async fn resolve(&self, raw_topic: &str) -> Result<bool>;
}
