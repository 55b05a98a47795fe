//! Cache → store → generate resolution shared by every artifact kind

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::cache::AdvisoryCache;
use crate::config::TimeoutConfig;
use crate::domain::topic::{ArtifactKind, TopicStore};
use crate::error::{Error, Result};

use super::orchestrator::RetrievalOrchestrator;

/// Upper bounds on collaborator calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBounds {
    pub store: Duration,
    pub knowledge: Duration,
    pub generation: Duration,
}

impl From<&TimeoutConfig> for CallBounds {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            store: config.store(),
            knowledge: config.knowledge(),
            generation: config.generation(),
        }
    }
}

impl Default for CallBounds {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

/// One artifact kind: where it lives in each tier and how to make it
#[async_trait]
pub(crate) trait Artifact: Send + Sync {
    type Value: Send + 'static;

    fn kind(&self) -> ArtifactKind;

    /// Empty values read as misses.
    async fn from_cache(&self, cache: &AdvisoryCache, topic: &str) -> Option<Self::Value>;

    /// Empty values read as misses.
    async fn from_store(
        &self,
        store: &dyn TopicStore,
        topic: &str,
    ) -> Result<Option<Self::Value>>;

    /// Produce the value on a full miss, writing it through both tiers.
    async fn generate(
        &self,
        orchestrator: &RetrievalOrchestrator,
        topic: &str,
    ) -> Option<Self::Value>;
}

impl RetrievalOrchestrator {
    /// Resolve `artifact` for canonical `topic` through the tiers.
    ///
    /// Store hits are not copied back into the cache. Generation runs under
    /// the `(topic, kind)` flight guard, and the tiers are read again once
    /// the guard is held so waiters pick up what the holder produced.
    pub(crate) async fn cascade<A: Artifact>(&self, artifact: &A, topic: &str) -> Option<A::Value> {
        if let Some(value) = self.read_tiers(artifact, topic).await {
            return Some(value);
        }

        let _flight = self
            .flights()
            .acquire((topic.to_string(), artifact.kind()))
            .await;

        if let Some(value) = self.read_tiers(artifact, topic).await {
            debug!(topic = %topic, kind = %artifact.kind(), "Filled by concurrent generation");
            return Some(value);
        }

        debug!(topic = %topic, kind = %artifact.kind(), "Full miss, generating");
        let value = artifact.generate(self, topic).await;
        if value.is_none() {
            warn!(topic = %topic, kind = %artifact.kind(), "Generation failed");
        }
        value
    }

    /// Cache, then store. Failures on either tier are misses.
    pub(crate) async fn read_tiers<A: Artifact>(
        &self,
        artifact: &A,
        topic: &str,
    ) -> Option<A::Value> {
        if let Some(value) = artifact.from_cache(self.cache(), topic).await {
            debug!(topic = %topic, kind = %artifact.kind(), "Cache hit");
            return Some(value);
        }

        let read = artifact.from_store(self.store().as_ref(), topic);
        match bounded(self.bounds().store, "store read", read).await {
            Ok(Some(value)) => {
                debug!(topic = %topic, kind = %artifact.kind(), "Store hit");
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(topic = %topic, kind = %artifact.kind(), error = %e, "Store read failed, treating as miss");
                None
            }
        }
    }
}

/// Bound a collaborator call; elapsing is a [`Error::Timeout`].
pub(crate) async fn bounded<T>(
    limit: Duration,
    what: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| Error::Timeout(what.to_string(), limit.as_millis() as u64))?
}

/// Run a store write, logging failure as lost durability
pub(crate) async fn store_write(
    limit: Duration,
    topic: &str,
    kind: ArtifactKind,
    write: impl Future<Output = Result<()>>,
) -> bool {
    match bounded(limit, "store write", write).await {
        Ok(()) => true,
        Err(e) => {
            error!(
                topic = %topic,
                kind = %kind,
                error = %e,
                "Store write failed; artifact is not durable and will be regenerated"
            );
            false
        }
    }
}

/// Run write-through persistence to completion even if the caller is
/// dropped mid-way.
pub(crate) async fn write_through(persist: impl Future<Output = ()> + Send + 'static) {
    if let Err(e) = tokio::spawn(persist).await {
        error!(error = %e, "Write-through task failed");
    }
}
