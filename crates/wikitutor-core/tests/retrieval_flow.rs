//! End-to-end retrieval tests
//!
//! Real SQLite store and moka cache, with counting fakes standing in for
//! the encyclopedia and the language model.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;

use wikitutor_core::api::{Status, TopicApi};
use wikitutor_core::cache::{AdvisoryCache, CacheTier, MemoryCache, keys};
use wikitutor_core::domain::topic::{
    Article, LearningPath, LinkSet, Summaries, SummaryLevel, SummarySet, TopicStore,
    TopicStoreStats,
};
use wikitutor_core::generation::{LearningPathRanker, SummarizationService};
use wikitutor_core::infrastructure::topic::SqliteTopicStore;
use wikitutor_core::knowledge::{FetchedPage, PageFetcher, WriteThroughSource};
use wikitutor_core::retrieval::{CallBounds, Collaborators, RetrievalOrchestrator};
use wikitutor_core::storage::Database;
use wikitutor_core::{Error, Result};

// ============================================================================
// Fakes
// ============================================================================

/// Encyclopedia keyed by lower-cased input
struct FakeEncyclopedia {
    pages: HashMap<String, FetchedPage>,
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait]
impl PageFetcher for FakeEncyclopedia {
    async fn fetch(&self, topic: &str) -> Result<Option<FetchedPage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.pages.get(&topic.to_lowercase()).cloned())
    }
}

fn page(title: &str, intro: &str, links: &[&str]) -> FetchedPage {
    FetchedPage {
        title: title.to_string(),
        intro: Some(intro.to_string()).filter(|text| !text.is_empty()),
        links: links.iter().map(|s| s.to_string()).collect(),
    }
}

fn encyclopedia() -> HashMap<String, FetchedPage> {
    let einstein = page(
        "Albert Einstein",
        "Albert Einstein was a theoretical physicist.",
        &["Theory_of_relativity", "Ulm", "Physics", "Albert_Einstein"],
    );
    let relativity = page(
        "Theory of relativity",
        "The theory of relativity comprises two physical theories.",
        &["Spacetime"],
    );
    let ulm = page("Ulm", "Ulm is a city on the Danube.", &["Danube"]);
    let physics = page("Physics", "Physics is the science of matter.", &["Energy"]);
    let stub = page("Stub", "A page nothing links out from.", &[]);

    let mut pages = HashMap::new();
    for (input, page) in [
        ("einstein", &einstein),
        ("albert einstein", &einstein),
        ("albert_einstein", &einstein),
        ("relativity", &relativity),
        ("theory of relativity", &relativity),
        ("theory_of_relativity", &relativity),
        ("ulm", &ulm),
        ("physics", &physics),
        ("stub", &stub),
    ] {
        pages.insert(input.to_string(), page.clone());
    }
    pages
}

struct CountingSummarizer {
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    delay: Duration,
}

#[async_trait]
impl SummarizationService for CountingSummarizer {
    async fn summarize(&self, text: &str) -> Result<Summaries> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::GenerationFailed("model returned prose".to_string()));
        }
        Ok(Summaries::new(
            format!("basic #{}: {}", n, text),
            format!("intermediate #{}: {}", n, text),
            format!("advanced #{}: {}", n, text),
        ))
    }
}

/// Returns a fixed ranking and records the context it was given
struct ScriptedRanker {
    output: Mutex<Vec<String>>,
    contexts: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LearningPathRanker for ScriptedRanker {
    async fn rank(&self, _topic: &str, links: &[String], context: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.to_string());
        if links.is_empty() {
            return Err(Error::GenerationFailed("no candidates".to_string()));
        }
        Ok(self.output.lock().unwrap().clone())
    }
}

/// Delegates to SQLite, optionally failing every write
struct FlakyStore {
    inner: SqliteTopicStore,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::DatabaseError(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl TopicStore for FlakyStore {
    async fn get_canonical(&self, user_input: &str) -> Result<Option<String>> {
        self.inner.get_canonical(user_input).await
    }
    async fn save_canonical(&self, user_input: &str, canonical_title: &str) -> Result<()> {
        self.check()?;
        self.inner.save_canonical(user_input, canonical_title).await
    }
    async fn get_article(&self, topic: &str) -> Result<Option<Article>> {
        self.inner.get_article(topic).await
    }
    async fn save_article(&self, topic: &str, full_text: &str) -> Result<()> {
        self.check()?;
        self.inner.save_article(topic, full_text).await
    }
    async fn get_links(&self, topic: &str) -> Result<Option<LinkSet>> {
        self.inner.get_links(topic).await
    }
    async fn save_links(&self, topic: &str, links: &[String]) -> Result<()> {
        self.check()?;
        self.inner.save_links(topic, links).await
    }
    async fn get_summaries(&self, topic: &str) -> Result<Option<SummarySet>> {
        self.inner.get_summaries(topic).await
    }
    async fn save_summaries(&self, topic: &str, summaries: &Summaries) -> Result<()> {
        self.check()?;
        self.inner.save_summaries(topic, summaries).await
    }
    async fn get_learning_path(&self, topic: &str) -> Result<Option<LearningPath>> {
        self.inner.get_learning_path(topic).await
    }
    async fn save_learning_path(&self, topic: &str, links: &[String]) -> Result<()> {
        self.check()?;
        self.inner.save_learning_path(topic, links).await
    }
    async fn clear_all(&self) -> Result<()> {
        self.inner.clear_all().await
    }
    async fn stats(&self) -> Result<TopicStoreStats> {
        self.inner.stats().await
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    orchestrator: Arc<RetrievalOrchestrator>,
    store: Arc<dyn TopicStore>,
    memory: Arc<MemoryCache>,
    fetches: Arc<AtomicUsize>,
    summaries: Arc<AtomicUsize>,
    rankings: Arc<AtomicUsize>,
    contexts: Arc<Mutex<Vec<String>>>,
    summarizer_fails: Arc<AtomicBool>,
    store_write_fails: Arc<AtomicBool>,
}

impl Harness {
    async fn new() -> Self {
        Self::with_delays(Duration::ZERO, Duration::ZERO).await
    }

    async fn with_delays(fetch_delay: Duration, summary_delay: Duration) -> Self {
        let db = Database::in_memory().await.unwrap();
        let store_write_fails = Arc::new(AtomicBool::new(false));
        let store: Arc<dyn TopicStore> = Arc::new(FlakyStore {
            inner: SqliteTopicStore::new(db.pool().clone()),
            fail_writes: Arc::clone(&store_write_fails),
        });

        let memory = Arc::new(MemoryCache::new(1_000));
        let cache = AdvisoryCache::new(
            memory.clone(),
            Duration::from_millis(250),
            Duration::from_secs(3_600),
            None,
        );

        let fetches = Arc::new(AtomicUsize::new(0));
        let source = Arc::new(WriteThroughSource::new(
            FakeEncyclopedia {
                pages: encyclopedia(),
                calls: Arc::clone(&fetches),
                delay: fetch_delay,
            },
            Arc::clone(&store),
            cache.clone(),
            Duration::from_secs(5),
        ));

        let summaries = Arc::new(AtomicUsize::new(0));
        let summarizer_fails = Arc::new(AtomicBool::new(false));
        let summarizer = Arc::new(CountingSummarizer {
            calls: Arc::clone(&summaries),
            fail: Arc::clone(&summarizer_fails),
            delay: summary_delay,
        });

        let rankings = Arc::new(AtomicUsize::new(0));
        let contexts = Arc::new(Mutex::new(Vec::new()));
        let ranker = Arc::new(ScriptedRanker {
            output: Mutex::new(
                [
                    "Relativity",
                    "Albert_Einstein",
                    "Ulm",
                    "Theory_of_relativity",
                    "Nowhere",
                    "Physics",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ),
            contexts: Arc::clone(&contexts),
            calls: Arc::clone(&rankings),
        });

        let orchestrator = RetrievalOrchestrator::new(
            Collaborators {
                cache,
                store: Arc::clone(&store),
                source,
                summarizer,
                ranker,
            },
            CallBounds::default(),
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            store,
            memory,
            fetches,
            summaries,
            rankings,
            contexts,
            summarizer_fails,
            store_write_fails,
        }
    }

    fn api(&self) -> TopicApi {
        TopicApi::new(Arc::clone(&self.orchestrator))
    }

    fn external_calls(&self) -> (usize, usize, usize) {
        (
            self.fetches.load(Ordering::SeqCst),
            self.summaries.load(Ordering::SeqCst),
            self.rankings.load(Ordering::SeqCst),
        )
    }
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_resolution_populates_both_tiers() {
    let h = Harness::new().await;

    let title = h.orchestrator.resolve_canonical("einstein").await;
    assert_eq!(title.as_deref(), Some("Albert Einstein"));
    assert_eq!(h.fetches.load(Ordering::SeqCst), 1);

    assert_eq!(
        h.store.get_canonical("einstein").await.unwrap().as_deref(),
        Some("Albert Einstein")
    );
    assert!(h.store.get_article("Albert Einstein").await.unwrap().is_some());
    assert!(h.store.get_links("Albert Einstein").await.unwrap().is_some());
    assert!(
        h.memory
            .get(&keys::article("Albert Einstein"))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_article_after_resolve_needs_no_second_fetch() {
    let h = Harness::new().await;

    h.orchestrator.resolve_canonical("einstein").await.unwrap();
    let article = h.orchestrator.get_article_text("Einstein").await;

    assert_eq!(
        article.as_deref(),
        Some("Albert Einstein was a theoretical physicist.")
    );
    assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unresolvable_and_blank_topics() {
    let h = Harness::new().await;

    assert_eq!(h.orchestrator.resolve_canonical("Atlantis").await, None);
    assert_eq!(h.orchestrator.get_article_text("Atlantis").await, None);
    assert_eq!(h.orchestrator.resolve_canonical("   ").await, None);
    assert_eq!(h.external_calls(), (2, 0, 0));
}

#[tokio::test]
async fn test_store_hit_on_canonical_is_written_back_to_cache() {
    let h = Harness::new().await;
    h.store.save_canonical("einstein", "Albert Einstein").await.unwrap();

    assert_eq!(
        h.orchestrator.resolve_canonical("EINSTEIN").await.as_deref(),
        Some("Albert Einstein")
    );
    assert_eq!(h.fetches.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.memory
            .get(&keys::canonical("einstein"))
            .await
            .unwrap()
            .as_deref(),
        Some("Albert Einstein")
    );
}

// ============================================================================
// Cascade
// ============================================================================

#[tokio::test]
async fn test_warm_tiers_serve_every_artifact_without_collaborators() {
    let h = Harness::new().await;

    let article = h.orchestrator.get_article_text("Einstein").await;
    let links = h.orchestrator.get_links("Einstein").await;
    let summary = h.orchestrator.get_summary("Einstein", SummaryLevel::Basic).await;
    let path = h.orchestrator.get_learning_path("Einstein", SummaryLevel::Basic).await;
    assert!(article.is_some() && links.is_some() && summary.is_some() && path.is_some());

    let warm = h.external_calls();
    for _ in 0..3 {
        assert_eq!(h.orchestrator.get_article_text("einstein").await, article);
        assert_eq!(h.orchestrator.get_links("einstein").await, links);
        assert_eq!(
            h.orchestrator.get_summary("einstein", SummaryLevel::Basic).await,
            summary
        );
        assert_eq!(
            h.orchestrator
                .get_learning_path("einstein", SummaryLevel::Basic)
                .await,
            path
        );
    }
    assert_eq!(h.external_calls(), warm);
}

#[tokio::test]
async fn test_store_hit_does_not_refill_cache() {
    let h = Harness::new().await;
    h.orchestrator.get_article_text("Einstein").await.unwrap();

    h.orchestrator.flush_cache().await;
    let article = h.orchestrator.get_article_text("Albert Einstein").await;

    assert!(article.is_some());
    assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.memory.get(&keys::article("Albert Einstein")).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_missing_links_trigger_a_full_fetch() {
    let h = Harness::new().await;
    h.orchestrator.resolve_canonical("Ulm").await.unwrap();

    h.orchestrator.flush_cache().await;
    h.store.clear_all().await.unwrap();
    h.store.save_canonical("ulm", "Ulm").await.unwrap();

    let links = h.orchestrator.get_links("Ulm").await;
    assert_eq!(links, Some(vec!["Danube".to_string()]));
    assert_eq!(h.fetches.load(Ordering::SeqCst), 2);
    assert!(h.store.get_article("Ulm").await.unwrap().is_some());
}

#[tokio::test]
async fn test_one_summary_generation_fills_every_level() {
    let h = Harness::new().await;

    let intermediate = h
        .orchestrator
        .get_summary("Einstein", SummaryLevel::Intermediate)
        .await
        .unwrap();
    assert!(intermediate.starts_with("intermediate #1"));

    let basic = h.orchestrator.get_summary("Einstein", SummaryLevel::Basic).await;
    let advanced = h.orchestrator.get_summary("Einstein", SummaryLevel::Advanced).await;
    assert!(basic.unwrap().starts_with("basic #1"));
    assert!(advanced.unwrap().starts_with("advanced #1"));
    assert_eq!(h.summaries.load(Ordering::SeqCst), 1);

    h.orchestrator.flush_cache().await;
    assert!(
        h.orchestrator
            .get_summary("Einstein", SummaryLevel::Advanced)
            .await
            .is_some()
    );
    assert_eq!(h.summaries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_summary_failure_is_not_persisted() {
    let h = Harness::new().await;
    h.summarizer_fails.store(true, Ordering::SeqCst);

    assert_eq!(
        h.orchestrator.get_summary("Einstein", SummaryLevel::Basic).await,
        None
    );
    assert!(h.store.get_summaries("Albert Einstein").await.unwrap().is_none());

    h.summarizer_fails.store(false, Ordering::SeqCst);
    assert!(
        h.orchestrator
            .get_summary("Einstein", SummaryLevel::Basic)
            .await
            .is_some()
    );
    assert_eq!(h.summaries.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_store_write_failure_still_returns_the_value() {
    let h = Harness::new().await;
    h.orchestrator.resolve_canonical("Einstein").await.unwrap();
    h.store_write_fails.store(true, Ordering::SeqCst);

    let summary = h.orchestrator.get_summary("Einstein", SummaryLevel::Basic).await;
    assert!(summary.is_some());
    assert!(h.store.get_summaries("Albert Einstein").await.unwrap().is_none());

    // Only the cache holds it; once that is gone the summary is regenerated.
    h.orchestrator.invalidate_topic("Albert Einstein").await;
    h.store_write_fails.store(false, Ordering::SeqCst);
    h.orchestrator.get_summary("Einstein", SummaryLevel::Basic).await.unwrap();
    assert_eq!(h.summaries.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Learning paths
// ============================================================================

#[tokio::test]
async fn test_learning_path_is_canonical_and_deduplicated() {
    let h = Harness::new().await;

    let path = h
        .orchestrator
        .get_learning_path("einstein", SummaryLevel::Advanced)
        .await
        .unwrap();

    assert_eq!(path, vec!["Theory of relativity", "Ulm", "Physics"]);
    let stored = h.store.get_learning_path("Albert Einstein").await.unwrap().unwrap();
    assert_eq!(stored.links, path);

    let contexts = h.contexts.lock().unwrap().clone();
    assert_eq!(contexts.len(), 1);
    assert!(contexts[0].starts_with("basic #1"));
}

#[tokio::test]
async fn test_learning_path_ignores_level() {
    let h = Harness::new().await;

    let basic = h.orchestrator.get_learning_path("Einstein", SummaryLevel::Basic).await;
    let advanced = h
        .orchestrator
        .get_learning_path("Einstein", SummaryLevel::Advanced)
        .await;

    assert_eq!(basic, advanced);
    assert_eq!(h.rankings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_learning_path_without_links_fails() {
    let h = Harness::new().await;

    assert_eq!(
        h.orchestrator.get_learning_path("Stub", SummaryLevel::Basic).await,
        None
    );
    assert!(h.store.get_learning_path("Stub").await.unwrap().is_none());
}

#[tokio::test]
async fn test_learning_path_ranks_with_empty_context_when_summary_fails() {
    let h = Harness::new().await;
    h.summarizer_fails.store(true, Ordering::SeqCst);

    let path = h.orchestrator.get_learning_path("Einstein", SummaryLevel::Basic).await;

    assert!(path.is_some());
    assert_eq!(h.contexts.lock().unwrap().as_slice(), [String::new()]);
}

#[tokio::test]
async fn test_regenerate_overwrites_stored_path() {
    let h = Harness::new().await;
    h.orchestrator
        .get_learning_path("Einstein", SummaryLevel::Basic)
        .await
        .unwrap();

    let regenerated = h.orchestrator.regenerate_learning_path("Einstein").await;
    assert!(regenerated.is_some());
    assert_eq!(h.rankings.load(Ordering::SeqCst), 2);

    let stored = h.store.get_learning_path("Albert Einstein").await.unwrap().unwrap();
    assert_eq!(Some(stored.links), regenerated);
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn test_invalidate_removes_every_topic_key() {
    let h = Harness::new().await;
    h.orchestrator
        .get_learning_path("Albert Einstein", SummaryLevel::Basic)
        .await
        .unwrap();
    for level in SummaryLevel::ALL {
        h.orchestrator.get_summary("Albert Einstein", level).await.unwrap();
    }

    h.orchestrator.invalidate_topic("Albert Einstein").await;

    for key in keys::topic_keys("Albert Einstein") {
        assert_eq!(h.memory.get(&key).await.unwrap(), None, "{key} survived");
    }

    let before = h.external_calls();
    assert!(h.orchestrator.get_article_text("Albert Einstein").await.is_some());
    assert!(
        h.orchestrator
            .get_summary("Albert Einstein", SummaryLevel::Advanced)
            .await
            .is_some()
    );
    assert!(
        h.orchestrator
            .get_learning_path("Albert Einstein", SummaryLevel::Basic)
            .await
            .is_some()
    );
    assert_eq!(h.external_calls(), before);
}

#[tokio::test]
async fn test_clear_store_forces_regeneration() {
    let h = Harness::new().await;
    h.orchestrator.get_summary("Ulm", SummaryLevel::Basic).await.unwrap();

    h.orchestrator.clear_store().await.unwrap();
    h.orchestrator.flush_cache().await;

    let stats = h.store.stats().await.unwrap();
    assert_eq!(stats.summary_sets, 0);

    h.orchestrator.get_summary("Ulm", SummaryLevel::Basic).await.unwrap();
    assert_eq!(h.summaries.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_misses_share_one_generation() {
    let h = Harness::with_delays(Duration::from_millis(20), Duration::from_millis(50)).await;

    let mut tasks = JoinSet::new();
    for i in 0..8 {
        let orchestrator = Arc::clone(&h.orchestrator);
        let input = if i % 2 == 0 { "einstein" } else { "Einstein" };
        tasks.spawn(async move { orchestrator.get_summary(input, SummaryLevel::Basic).await });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.unwrap());
    }

    assert!(results.iter().all(|r| r.is_some()));
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(h.summaries.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Boundary
// ============================================================================

#[tokio::test]
async fn test_api_status_mapping() {
    let h = Harness::new().await;
    let api = h.api();

    let invalid = api.summary("Einstein", Some("expert")).await;
    assert_eq!(invalid.status, Status::BadRequest);
    assert_eq!(invalid.error_message(), Some("Invalid level."));

    let missing = api.summary("Atlantis", None).await;
    assert_eq!(missing.status, Status::NotFound);
    assert_eq!(missing.status.code(), 404);

    let summary = api.summary("einstein", Some("ADVANCED")).await;
    assert_eq!(summary.status, Status::Ok);
    assert_eq!(summary.body["topic"], "Albert Einstein");
    assert_eq!(summary.body["level"], "advanced");

    let path = api.learning_path("Einstein", None).await;
    assert_eq!(path.status, Status::Ok);
    assert_eq!(path.body["level"], "basic");
    assert_eq!(path.body["links"][0], "Theory of relativity");

    let resolved = api.resolve("einstein").await;
    assert_eq!(resolved.body["topic"], "Albert Einstein");
}

#[tokio::test]
async fn test_api_generation_failure_is_500() {
    let h = Harness::new().await;
    h.summarizer_fails.store(true, Ordering::SeqCst);
    let api = h.api();

    let summary = api.summary("Einstein", None).await;
    assert_eq!(summary.status, Status::InternalError);
    assert_eq!(
        summary.error_message(),
        Some("Failed to retrieve summary for 'Albert Einstein'")
    );

    let path = api.learning_path("Stub", None).await;
    assert_eq!(path.status, Status::InternalError);

    let rerank = api.rerank("Stub").await;
    assert_eq!(rerank.status, Status::InternalError);
    assert_eq!(rerank.error_message(), Some("Failed to generate learning path"));
}

#[tokio::test]
async fn test_api_rerank_returns_basic_summary() {
    let h = Harness::new().await;
    let api = h.api();

    let rerank = api.rerank("Einstein").await;

    assert_eq!(rerank.status, Status::Ok);
    assert!(rerank.body["summary"].as_str().unwrap().starts_with("basic #"));
    assert_eq!(rerank.body["links"].as_array().unwrap().len(), 3);
}
