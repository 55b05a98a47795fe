//! Raw user input → canonical title

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cache::{AdvisoryCache, keys};
use crate::domain::topic::{ArtifactKind, TopicStore, normalize_input};
use crate::knowledge::KnowledgeSource;

use super::cascade::{CallBounds, bounded};
use super::single_flight::KeyedLocks;

/// Maps arbitrary strings to canonical titles
#[async_trait]
pub trait Canonicalizer: Send + Sync {
    /// `None` when the input names nothing the knowledge source knows.
    async fn canonicalize(&self, input: &str) -> Option<String>;
}

/// Canonicalizer that consults the cache, then the store, then the
/// knowledge source
///
/// The knowledge source only reports success; the mapping it wrote is read
/// back from the tiers.
pub struct CanonicalResolver {
    cache: AdvisoryCache,
    store: Arc<dyn TopicStore>,
    source: Arc<dyn KnowledgeSource>,
    bounds: CallBounds,
    flights: KeyedLocks<(String, ArtifactKind)>,
}

impl CanonicalResolver {
    pub fn new(
        cache: AdvisoryCache,
        store: Arc<dyn TopicStore>,
        source: Arc<dyn KnowledgeSource>,
        bounds: CallBounds,
    ) -> Self {
        Self {
            cache,
            store,
            source,
            bounds,
            flights: KeyedLocks::new(),
        }
    }

    pub async fn resolve(&self, input: &str) -> Option<String> {
        if input.trim().is_empty() {
            return None;
        }
        let key = normalize_input(input);

        if let Some(title) = self.read_tiers(&key).await {
            return Some(title);
        }

        let _flight = self
            .flights
            .acquire((key.clone(), ArtifactKind::Canonical))
            .await;

        if let Some(title) = self.read_tiers(&key).await {
            return Some(title);
        }

        match bounded(self.bounds.knowledge, "knowledge source", self.source.resolve(input)).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!(input = %input, error = %e, "Knowledge source failed");
                return None;
            }
        }

        let title = match self.cache_lookup(&key).await {
            Some(title) => Some(title),
            None => self.store_lookup(&key).await,
        };
        match &title {
            Some(title) => info!(input = %input, canonical = %title, "Canonical topic resolved"),
            None => warn!(input = %input, "Resolution reported success but no mapping was written"),
        }
        title
    }

    /// Cache, then store. A store hit is copied into the cache.
    async fn read_tiers(&self, key: &str) -> Option<String> {
        if let Some(title) = self.cache_lookup(key).await {
            debug!(input = %key, "Canonical cache hit");
            return Some(title);
        }

        let title = self.store_lookup(key).await?;
        debug!(input = %key, "Canonical store hit");
        self.cache.set_canonical(key, &title).await;
        Some(title)
    }

    async fn cache_lookup(&self, key: &str) -> Option<String> {
        self.cache
            .get_text(&keys::canonical(key))
            .await
            .filter(|title| !title.is_empty())
    }

    async fn store_lookup(&self, key: &str) -> Option<String> {
        match bounded(self.bounds.store, "store read", self.store.get_canonical(key)).await {
            Ok(title) => title.filter(|title| !title.is_empty()),
            Err(e) => {
                warn!(input = %key, error = %e, "Canonical store read failed, treating as miss");
                None
            }
        }
    }
}

#[async_trait]
impl Canonicalizer for CanonicalResolver {
    async fn canonicalize(&self, input: &str) -> Option<String> {
        self.resolve(input).await
    }
}
