//! Application wiring
//!
//! Builds the cache, store, knowledge source and generation services from a
//! [`Config`] and hands them to one shared orchestrator.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::cache::{AdvisoryCache, MemoryCache};
use crate::config::Config;
use crate::domain::topic::TopicStore;
use crate::generation::{
    LearningPathRanker, LlmRanker, LlmSummarizer, SummarizationService, Unconfigured,
};
use crate::infrastructure::topic::SqliteTopicStore;
use crate::knowledge::{WikipediaClient, WriteThroughSource};
use crate::llm::{CompletionOptions, LlmClient};
use crate::retrieval::{CallBounds, Collaborators, RetrievalOrchestrator};
use crate::storage::{Database, DatabaseConfig};

use super::health::{self, HealthReport};
use super::response::ApiResponse;
use super::topics::TopicApi;

/// Fully wired application
#[derive(Clone)]
pub struct Wikitutor {
    config: Config,
    database: Database,
    cache: AdvisoryCache,
    topics: TopicApi,
}

impl Wikitutor {
    /// Open the configured database and wire every service around it.
    pub async fn open(config: Config) -> anyhow::Result<Self> {
        let path = config.database_path()?;
        let database = Database::new(DatabaseConfig::with_path(path.clone()))
            .await
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::with_database(config, database)
    }

    pub fn with_database(config: Config, database: Database) -> anyhow::Result<Self> {
        config.validate()?;

        let cache = AdvisoryCache::new(
            Arc::new(MemoryCache::new(config.cache.max_entries)),
            config.timeouts.cache(),
            config.cache.ttl(),
            config.cache.canonical_ttl(),
        );
        let store: Arc<dyn TopicStore> = Arc::new(SqliteTopicStore::new(database.pool().clone()));

        let fetcher = WikipediaClient::new(&config.knowledge)?;
        let source = Arc::new(WriteThroughSource::new(
            fetcher,
            Arc::clone(&store),
            cache.clone(),
            config.timeouts.store(),
        ));

        let (summarizer, ranker) = generation_services(&config)?;

        let orchestrator = RetrievalOrchestrator::new(
            Collaborators {
                cache: cache.clone(),
                store,
                source,
                summarizer,
                ranker,
            },
            CallBounds::from(&config.timeouts),
        );

        Ok(Self {
            config,
            database,
            cache,
            topics: TopicApi::new(Arc::new(orchestrator)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn topics(&self) -> &TopicApi {
        &self.topics
    }

    pub async fn doctor(&self) -> HealthReport {
        health::doctor(&self.config, &self.database, &self.cache).await
    }

    // ========== Administration ==========

    /// Drop every cache key held for `topic`, taken as given.
    pub async fn invalidate(&self, topic: &str) -> ApiResponse {
        self.topics.orchestrator().invalidate_topic(topic).await;
        ApiResponse::ok(&serde_json::json!({ "topic": topic, "invalidated": true }))
    }

    pub async fn flush_cache(&self) -> ApiResponse {
        self.topics.orchestrator().flush_cache().await;
        ApiResponse::ok(&serde_json::json!({ "flushed": true }))
    }

    pub async fn clear_store(&self) -> ApiResponse {
        match self.topics.orchestrator().clear_store().await {
            Ok(()) => ApiResponse::ok(&serde_json::json!({ "cleared": true })),
            Err(e) => ApiResponse::internal(format!("Failed to clear store: {}", e)),
        }
    }
}

type GenerationServices = (Arc<dyn SummarizationService>, Arc<dyn LearningPathRanker>);

fn generation_services(config: &Config) -> anyhow::Result<GenerationServices> {
    let Some(api_key) = config.llm.resolved_api_key()? else {
        info!("No API key set; summaries and learning paths are unavailable");
        return Ok((Arc::new(Unconfigured), Arc::new(Unconfigured)));
    };

    let client = LlmClient::new(config.llm.clone(), api_key)?;
    let generation = &config.generation;
    info!(model = %client.default_model(), "Generation services ready");

    let summarizer = LlmSummarizer::new(
        client.clone(),
        CompletionOptions::new(generation.summary_temperature, generation.summary_max_tokens),
    );
    let ranker = LlmRanker::new(
        client,
        CompletionOptions::new(generation.ranker_temperature, generation.ranker_max_tokens),
        generation.learning_path_length,
    );

    Ok((Arc::new(summarizer), Arc::new(ranker)))
}
