//! Retrieval orchestrator
//!
//! Every operation canonicalizes its input first, then resolves the
//! requested artifact through cache, store and generation. Failures of any
//! collaborator are logged and surface as `None`.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cache::{AdvisoryCache, keys};
use crate::domain::topic::{ArtifactKind, Summaries, SummaryLevel, TopicStore};
use crate::error::Result;
use crate::generation::{LearningPathRanker, SummarizationService};
use crate::knowledge::KnowledgeSource;

use super::artifacts::{ArticleText, LeveledSummary, RankedPath, RelatedLinks};
use super::cascade::{CallBounds, bounded, store_write, write_through};
use super::dedup::dedup;
use super::resolver::CanonicalResolver;
use super::single_flight::KeyedLocks;

/// Service handles the orchestrator is built from
#[derive(Clone)]
pub struct Collaborators {
    pub cache: AdvisoryCache,
    pub store: Arc<dyn TopicStore>,
    pub source: Arc<dyn KnowledgeSource>,
    pub summarizer: Arc<dyn SummarizationService>,
    pub ranker: Arc<dyn LearningPathRanker>,
}

/// Composes the tiers and the external services into the retrieval
/// operations
pub struct RetrievalOrchestrator {
    resolver: CanonicalResolver,
    cache: AdvisoryCache,
    store: Arc<dyn TopicStore>,
    source: Arc<dyn KnowledgeSource>,
    summarizer: Arc<dyn SummarizationService>,
    ranker: Arc<dyn LearningPathRanker>,
    bounds: CallBounds,
    flights: KeyedLocks<(String, ArtifactKind)>,
}

impl RetrievalOrchestrator {
    pub fn new(collaborators: Collaborators, bounds: CallBounds) -> Self {
        let Collaborators {
            cache,
            store,
            source,
            summarizer,
            ranker,
        } = collaborators;

        let resolver = CanonicalResolver::new(
            cache.clone(),
            Arc::clone(&store),
            Arc::clone(&source),
            bounds,
        );

        Self {
            resolver,
            cache,
            store,
            source,
            summarizer,
            ranker,
            bounds,
            flights: KeyedLocks::new(),
        }
    }

    pub(crate) fn cache(&self) -> &AdvisoryCache {
        &self.cache
    }

    pub(crate) fn store(&self) -> &Arc<dyn TopicStore> {
        &self.store
    }

    pub(crate) fn bounds(&self) -> &CallBounds {
        &self.bounds
    }

    pub(crate) fn flights(&self) -> &KeyedLocks<(String, ArtifactKind)> {
        &self.flights
    }

    // ========== Retrieval ==========

    /// Canonical title for arbitrary user input
    pub async fn resolve_canonical(&self, input: &str) -> Option<String> {
        self.resolver.resolve(input).await
    }

    pub async fn get_article_text(&self, topic: &str) -> Option<String> {
        let canonical = self.resolve_canonical(topic).await?;
        self.cascade(&ArticleText, &canonical).await
    }

    pub async fn get_links(&self, topic: &str) -> Option<Vec<String>> {
        let canonical = self.resolve_canonical(topic).await?;
        self.cascade(&RelatedLinks, &canonical).await
    }

    /// One generation produces all three levels, so a miss on one level
    /// leaves the other two ready in both tiers.
    pub async fn get_summary(&self, topic: &str, level: SummaryLevel) -> Option<String> {
        let canonical = self.resolve_canonical(topic).await?;
        self.cascade(&LeveledSummary(level), &canonical).await
    }

    /// `level` does not change the path: one ranking serves every level.
    pub async fn get_learning_path(&self, topic: &str, level: SummaryLevel) -> Option<Vec<String>> {
        let canonical = self.resolve_canonical(topic).await?;
        debug!(topic = %canonical, level = %level, "Learning path requested");
        self.cascade(&RankedPath, &canonical).await
    }

    /// Rank again, skipping both tiers, and overwrite the stored path.
    pub async fn regenerate_learning_path(&self, topic: &str) -> Option<Vec<String>> {
        let canonical = self.resolve_canonical(topic).await?;
        let _flight = self
            .flights
            .acquire((canonical.clone(), ArtifactKind::LearningPath))
            .await;
        self.generate_learning_path(&canonical).await
    }

    // ========== Administration ==========

    /// Drop every cache key held for `topic`. Pass the canonical title;
    /// the raw string is used as given.
    pub async fn invalidate_topic(&self, topic: &str) {
        self.cache.invalidate_topic(topic).await;
    }

    pub async fn flush_cache(&self) {
        self.cache.flush_all().await;
    }

    /// Remove every record from the persistent store
    pub async fn clear_store(&self) -> Result<()> {
        self.store.clear_all().await?;
        warn!("Persistent store cleared");
        Ok(())
    }

    // ========== Generation ==========

    /// Ask the knowledge source to (re)populate both tiers for `topic`.
    pub(crate) async fn fetch_from_source(&self, topic: &str) -> bool {
        match bounded(self.bounds.knowledge, "knowledge source", self.source.resolve(topic)).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Knowledge source failed");
                false
            }
        }
    }

    /// Summarize the article and write all three levels through.
    pub(crate) async fn generate_summaries(&self, topic: &str) -> Option<Summaries> {
        let Some(article) = self.cascade(&ArticleText, topic).await else {
            warn!(topic = %topic, "No article text to summarize");
            return None;
        };

        let summaries = match bounded(
            self.bounds.generation,
            "summarization",
            self.summarizer.summarize(&article),
        )
        .await
        {
            Ok(summaries) => summaries,
            Err(e) => {
                error!(topic = %topic, error = %e, "Summarization failed");
                return None;
            }
        };

        write_through(persist_summaries(
            Arc::clone(&self.store),
            self.cache.clone(),
            self.bounds,
            topic.to_string(),
            summaries.clone(),
        ))
        .await;

        info!(topic = %topic, "Generated and stored summaries");
        Some(summaries)
    }

    /// Rank the topic's links with a basic summary as context, canonicalize
    /// and deduplicate the result, and write it through.
    pub(crate) async fn generate_learning_path(&self, topic: &str) -> Option<Vec<String>> {
        let Some(links) = self.cascade(&RelatedLinks, topic).await else {
            warn!(topic = %topic, "No links to rank");
            return None;
        };
        let context = self
            .cascade(&LeveledSummary(SummaryLevel::Basic), topic)
            .await
            .unwrap_or_default();

        let ranked = match bounded(
            self.bounds.generation,
            "ranking",
            self.ranker.rank(topic, &links, &context),
        )
        .await
        {
            Ok(ranked) => ranked,
            Err(e) => {
                error!(topic = %topic, error = %e, "Ranking failed");
                return None;
            }
        };

        let path = dedup(&ranked, topic, &self.resolver).await;
        if path.is_empty() {
            warn!(topic = %topic, ranked = ranked.len(), "Learning path empty after deduplication");
            return None;
        }

        write_through(persist_learning_path(
            Arc::clone(&self.store),
            self.cache.clone(),
            self.bounds,
            topic.to_string(),
            path.clone(),
        ))
        .await;

        info!(topic = %topic, count = path.len(), "Generated and stored learning path");
        Some(path)
    }
}

async fn persist_summaries(
    store: Arc<dyn TopicStore>,
    cache: AdvisoryCache,
    bounds: CallBounds,
    topic: String,
    summaries: Summaries,
) {
    store_write(
        bounds.store,
        &topic,
        ArtifactKind::Summary,
        store.save_summaries(&topic, &summaries),
    )
    .await;

    for (level, text) in summaries.iter() {
        cache.set_text(&keys::summary(&topic, level), text).await;
    }
}

async fn persist_learning_path(
    store: Arc<dyn TopicStore>,
    cache: AdvisoryCache,
    bounds: CallBounds,
    topic: String,
    path: Vec<String>,
) {
    store_write(
        bounds.store,
        &topic,
        ArtifactKind::LearningPath,
        store.save_learning_path(&topic, &path),
    )
    .await;

    cache.set_list(&keys::learning_path(&topic), &path).await;
}
