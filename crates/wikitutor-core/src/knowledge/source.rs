use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::cache::{AdvisoryCache, keys};
use crate::domain::topic::{TopicStore, normalize_input};
use crate::error::{Error, Result};

use super::{FetchedPage, KnowledgeSource, PageFetcher};

/// Knowledge source that persists every resolved page to the store, then
/// to the cache, before reporting success
pub struct WriteThroughSource<F> {
    fetcher: F,
    store: Arc<dyn TopicStore>,
    cache: AdvisoryCache,
    store_timeout: Duration,
}

impl<F: PageFetcher> WriteThroughSource<F> {
    pub fn new(
        fetcher: F,
        store: Arc<dyn TopicStore>,
        cache: AdvisoryCache,
        store_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            cache,
            store_timeout,
        }
    }
}

#[async_trait]
impl<F: PageFetcher> KnowledgeSource for WriteThroughSource<F> {
    async fn resolve(&self, raw_topic: &str) -> Result<bool> {
        let Some(page) = self.fetcher.fetch(raw_topic).await? else {
            warn!(topic = %raw_topic, "Topic could not be resolved");
            return Ok(false);
        };

        info!(input = %raw_topic, canonical = %page.title, "Topic resolved");

        // Detached so a dropped caller cannot interrupt a write in progress.
        let task = tokio::spawn(persist_page(
            Arc::clone(&self.store),
            self.cache.clone(),
            self.store_timeout,
            normalize_input(raw_topic),
            page,
        ));

        task.await
            .map_err(|e| Error::Other(format!("Persistence task failed: {}", e)))?;
        Ok(true)
    }
}

async fn persist_page(
    store: Arc<dyn TopicStore>,
    cache: AdvisoryCache,
    store_timeout: Duration,
    user_input: String,
    page: FetchedPage,
) {
    let title = page.title.as_str();
    let intro = page.intro.as_deref().filter(|text| !text.is_empty());
    let has_links = !page.links.is_empty();

    // The title is also recorded as its own canonical form, so later lookups
    // by canonical title do not go back to the encyclopedia.
    let title_key = normalize_input(title);
    let mapping_keys: Vec<&str> = if title_key == user_input {
        vec![user_input.as_str()]
    } else {
        vec![user_input.as_str(), title_key.as_str()]
    };

    for key in &mapping_keys {
        bounded_write(store_timeout, title, "canonical", store.save_canonical(key, title)).await;
    }
    if let Some(text) = intro {
        bounded_write(store_timeout, title, "article", store.save_article(title, text)).await;
    }
    if has_links {
        bounded_write(store_timeout, title, "links", store.save_links(title, &page.links)).await;
    }

    for key in &mapping_keys {
        cache.set_canonical(key, title).await;
    }
    if let Some(text) = intro {
        cache.set_text(&keys::article(title), text).await;
    }
    if has_links {
        cache.set_list(&keys::links(title), &page.links).await;
    }
}

async fn bounded_write(
    limit: Duration,
    topic: &str,
    kind: &str,
    write: impl std::future::Future<Output = Result<()>>,
) {
    match tokio::time::timeout(limit, write).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(topic = %topic, kind = %kind, error = %e, "Store write failed; artifact is not durable")
        }
        Err(_) => {
            error!(topic = %topic, kind = %kind, "Store write timed out; artifact is not durable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheTier, MemoryCache};
    use crate::infrastructure::topic::SqliteTopicStore;
    use crate::storage::Database;

    struct StaticFetcher(Option<FetchedPage>);

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, _topic: &str) -> Result<Option<FetchedPage>> {
            Ok(self.0.clone())
        }
    }

    async fn setup(
        page: Option<FetchedPage>,
    ) -> (WriteThroughSource<StaticFetcher>, Arc<dyn TopicStore>, Arc<MemoryCache>) {
        let db = Database::in_memory().await.unwrap();
        let store: Arc<dyn TopicStore> = Arc::new(SqliteTopicStore::new(db.pool().clone()));
        let memory = Arc::new(MemoryCache::new(100));
        let cache = AdvisoryCache::new(
            memory.clone(),
            Duration::from_millis(250),
            Duration::from_secs(60),
            None,
        );
        let source = WriteThroughSource::new(
            StaticFetcher(page),
            Arc::clone(&store),
            cache,
            Duration::from_secs(5),
        );
        (source, store, memory)
    }

    #[tokio::test]
    async fn test_resolve_writes_both_tiers() {
        let page = FetchedPage {
            title: "Albert Einstein".into(),
            intro: Some("Physicist.".into()),
            links: vec!["Physics".into(), "Ulm".into()],
        };
        let (source, store, memory) = setup(Some(page)).await;

        assert!(source.resolve("Einstein").await.unwrap());

        assert_eq!(
            store.get_canonical("einstein").await.unwrap().as_deref(),
            Some("Albert Einstein")
        );
        assert_eq!(
            store.get_article("Albert Einstein").await.unwrap().unwrap().full_text,
            "Physicist."
        );
        assert_eq!(
            store.get_links("Albert Einstein").await.unwrap().unwrap().links,
            vec!["Physics", "Ulm"]
        );
        assert_eq!(
            memory.get("canonical:einstein").await.unwrap().as_deref(),
            Some("Albert Einstein")
        );
        assert_eq!(
            memory.get("article:Albert Einstein").await.unwrap().as_deref(),
            Some("Physicist.")
        );
        assert_eq!(
            store.get_canonical("albert einstein").await.unwrap().as_deref(),
            Some("Albert Einstein")
        );
        assert_eq!(store.stats().await.unwrap().canonical_mappings, 2);
    }

    #[tokio::test]
    async fn test_empty_intro_and_links_are_not_written() {
        let page = FetchedPage {
            title: "Stub".into(),
            intro: None,
            links: Vec::new(),
        };
        let (source, store, memory) = setup(Some(page)).await;

        assert!(source.resolve("stub").await.unwrap());

        assert!(store.get_canonical("stub").await.unwrap().is_some());
        assert!(store.get_article("Stub").await.unwrap().is_none());
        assert!(store.get_links("Stub").await.unwrap().is_none());
        assert!(memory.get("article:Stub").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unresolved_topic_writes_nothing() {
        let (source, store, _) = setup(None).await;

        assert!(!source.resolve("asdfghjkl").await.unwrap());
        assert_eq!(store.stats().await.unwrap().canonical_mappings, 0);
    }
}
