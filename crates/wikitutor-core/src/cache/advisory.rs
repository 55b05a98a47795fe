use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

use super::{CacheTier, keys};

/// Timeout-bounded, failure-swallowing view over a [`CacheTier`]
///
/// Reads return `None` on miss, failure, timeout or corrupted entry. Writes
/// and deletes log failures and return nothing.
#[derive(Clone)]
pub struct AdvisoryCache {
    inner: Arc<dyn CacheTier>,
    timeout: Duration,
    ttl: Duration,
    canonical_ttl: Option<Duration>,
}

impl AdvisoryCache {
    pub fn new(
        inner: Arc<dyn CacheTier>,
        timeout: Duration,
        ttl: Duration,
        canonical_ttl: Option<Duration>,
    ) -> Self {
        Self {
            inner,
            timeout,
            ttl,
            canonical_ttl,
        }
    }

    /// Expiry applied to derived artifacts
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| Error::Timeout(format!("cache {}", op), self.timeout.as_millis() as u64))?
    }

    // ========== Reads ==========

    pub async fn get_text(&self, key: &str) -> Option<String> {
        match self.bounded("get", self.inner.get(key)).await {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache get failed, treating as miss");
                None
            }
        }
    }

    /// Read a JSON-encoded title list. A corrupted entry is a miss.
    pub async fn get_list(&self, key: &str) -> Option<Vec<String>> {
        let raw = self.get_text(key).await?;
        match serde_json::from_str(&raw) {
            Ok(list) => Some(list),
            Err(e) => {
                error!(key = %key, error = %e, "Corrupted cache entry");
                None
            }
        }
    }

    // ========== Writes ==========

    pub async fn set_text(&self, key: &str, value: &str) {
        self.write(key, value, Some(self.ttl)).await;
    }

    pub async fn set_list(&self, key: &str, list: &[String]) {
        match serde_json::to_string(list) {
            Ok(json) => self.write(key, &json, Some(self.ttl)).await,
            Err(e) => error!(key = %key, error = %e, "Failed to encode cache entry"),
        }
    }

    /// Store a canonical mapping keyed by normalized user input
    pub async fn set_canonical(&self, user_input: &str, canonical_title: &str) {
        self.write(&keys::canonical(user_input), canonical_title, self.canonical_ttl)
            .await;
    }

    async fn write(&self, key: &str, value: &str, ttl: Option<Duration>) {
        if let Err(e) = self.bounded("set", self.inner.set(key, value, ttl)).await {
            error!(key = %key, error = %e, "Cache set failed");
        }
    }

    // ========== Invalidation ==========

    pub async fn invalidate_topic(&self, topic: &str) {
        match self.bounded("delete_topic", self.inner.delete_topic(topic)).await {
            Ok(()) => info!(topic = %topic, "Cache invalidated for topic"),
            Err(e) => error!(topic = %topic, error = %e, "Cache invalidation failed"),
        }
    }

    pub async fn flush_all(&self) {
        match self.bounded("flush_all", self.inner.flush_all()).await {
            Ok(()) => warn!("Entire cache cleared"),
            Err(e) => error!(error = %e, "Cache flush failed"),
        }
    }

    /// Write, read back and delete a health-check key
    pub async fn round_trip(&self) -> Result<()> {
        const CHECK_KEY: &str = "__wikitutor_health__";
        self.bounded("set", self.inner.set(CHECK_KEY, "ok", Some(Duration::from_secs(5))))
            .await?;
        let value = self.bounded("get", self.inner.get(CHECK_KEY)).await?;
        self.bounded("delete", self.inner.delete(CHECK_KEY)).await?;
        match value.as_deref() {
            Some("ok") => Ok(()),
            _ => Err(Error::CacheError("health-check value was not read back".to_string())),
        }
    }
}
