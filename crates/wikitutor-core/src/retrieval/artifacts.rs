//! Tier layout and generation for each artifact kind

use async_trait::async_trait;

use crate::cache::{AdvisoryCache, keys};
use crate::domain::topic::{ArtifactKind, SummaryLevel, TopicStore};
use crate::error::Result;

use super::cascade::Artifact;
use super::orchestrator::RetrievalOrchestrator;

/// Article intro text. Generated by the knowledge source.
pub(crate) struct ArticleText;

/// Related topic titles. Generated by the knowledge source.
pub(crate) struct RelatedLinks;

/// One level of the summary set. Generation writes all three levels.
pub(crate) struct LeveledSummary(pub SummaryLevel);

/// Ranked, deduplicated learning path
pub(crate) struct RankedPath;

#[async_trait]
impl Artifact for ArticleText {
    type Value = String;

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Article
    }

    async fn from_cache(&self, cache: &AdvisoryCache, topic: &str) -> Option<String> {
        cache
            .get_text(&keys::article(topic))
            .await
            .filter(|text| !text.is_empty())
    }

    async fn from_store(&self, store: &dyn TopicStore, topic: &str) -> Result<Option<String>> {
        Ok(store
            .get_article(topic)
            .await?
            .map(|article| article.full_text)
            .filter(|text| !text.is_empty()))
    }

    async fn generate(&self, orchestrator: &RetrievalOrchestrator, topic: &str) -> Option<String> {
        if !orchestrator.fetch_from_source(topic).await {
            return None;
        }
        orchestrator.read_tiers(self, topic).await
    }
}

#[async_trait]
impl Artifact for RelatedLinks {
    type Value = Vec<String>;

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Links
    }

    async fn from_cache(&self, cache: &AdvisoryCache, topic: &str) -> Option<Vec<String>> {
        cache
            .get_list(&keys::links(topic))
            .await
            .filter(|links| !links.is_empty())
    }

    async fn from_store(&self, store: &dyn TopicStore, topic: &str) -> Result<Option<Vec<String>>> {
        Ok(store
            .get_links(topic)
            .await?
            .map(|set| set.links)
            .filter(|links| !links.is_empty()))
    }

    async fn generate(
        &self,
        orchestrator: &RetrievalOrchestrator,
        topic: &str,
    ) -> Option<Vec<String>> {
        if !orchestrator.fetch_from_source(topic).await {
            return None;
        }
        orchestrator.read_tiers(self, topic).await
    }
}

#[async_trait]
impl Artifact for LeveledSummary {
    type Value = String;

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Summary
    }

    async fn from_cache(&self, cache: &AdvisoryCache, topic: &str) -> Option<String> {
        cache
            .get_text(&keys::summary(topic, self.0))
            .await
            .filter(|text| !text.is_empty())
    }

    async fn from_store(&self, store: &dyn TopicStore, topic: &str) -> Result<Option<String>> {
        Ok(store
            .get_summaries(topic)
            .await?
            .map(|set| set.summaries.get(self.0).to_string())
            .filter(|text| !text.is_empty()))
    }

    async fn generate(&self, orchestrator: &RetrievalOrchestrator, topic: &str) -> Option<String> {
        let summaries = orchestrator.generate_summaries(topic).await?;
        Some(summaries.get(self.0).to_string())
    }
}

#[async_trait]
impl Artifact for RankedPath {
    type Value = Vec<String>;

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::LearningPath
    }

    async fn from_cache(&self, cache: &AdvisoryCache, topic: &str) -> Option<Vec<String>> {
        cache
            .get_list(&keys::learning_path(topic))
            .await
            .filter(|path| !path.is_empty())
    }

    async fn from_store(&self, store: &dyn TopicStore, topic: &str) -> Result<Option<Vec<String>>> {
        Ok(store
            .get_learning_path(topic)
            .await?
            .map(|path| path.links)
            .filter(|links| !links.is_empty()))
    }

    async fn generate(
        &self,
        orchestrator: &RetrievalOrchestrator,
        topic: &str,
    ) -> Option<Vec<String>> {
        orchestrator.generate_learning_path(topic).await
    }
}
