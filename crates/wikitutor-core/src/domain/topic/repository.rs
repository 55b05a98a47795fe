//! Repository trait for the persistent topic store
//!
//! The store is the source of truth for every artifact. Each write is an
//! upsert by topic that commits atomically or not at all.

use async_trait::async_trait;

use crate::error::Result;

use super::entity::{Article, LearningPath, LinkSet, Summaries, SummarySet};

/// Row counts per artifact table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicStoreStats {
    pub canonical_mappings: u64,
    pub articles: u64,
    pub link_sets: u64,
    pub summary_sets: u64,
    pub learning_paths: u64,
}

/// Durable record-per-canonical-topic storage
///
/// Canonical-mapping keys are expected to be normalized by the caller
/// (see [`normalize_input`](super::normalize_input)).
#[async_trait]
pub trait TopicStore: Send + Sync {
    // ========== Canonical mappings ==========

    async fn get_canonical(&self, user_input: &str) -> Result<Option<String>>;

    async fn save_canonical(&self, user_input: &str, canonical_title: &str) -> Result<()>;

    // ========== Articles ==========

    async fn get_article(&self, topic: &str) -> Result<Option<Article>>;

    async fn save_article(&self, topic: &str, full_text: &str) -> Result<()>;

    // ========== Link sets ==========

    async fn get_links(&self, topic: &str) -> Result<Option<LinkSet>>;

    async fn save_links(&self, topic: &str, links: &[String]) -> Result<()>;

    // ========== Summaries ==========

    async fn get_summaries(&self, topic: &str) -> Result<Option<SummarySet>>;

    /// Write all three levels in one commit
    async fn save_summaries(&self, topic: &str, summaries: &Summaries) -> Result<()>;

    // ========== Learning paths ==========

    async fn get_learning_path(&self, topic: &str) -> Result<Option<LearningPath>>;

    /// Overwrites any existing path for the topic
    async fn save_learning_path(&self, topic: &str, links: &[String]) -> Result<()>;

    // ========== Administration ==========

    /// Remove every record from every artifact table
    async fn clear_all(&self) -> Result<()>;

    async fn stats(&self) -> Result<TopicStoreStats>;
}
