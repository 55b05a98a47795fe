//! Cache tier
//!
//! The fast path for every artifact kind. The cache is advisory: callers go
//! through [`AdvisoryCache`], which bounds every round trip by a timeout and
//! turns failures and corrupted entries into misses.

mod advisory;
pub mod keys;
mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use advisory::AdvisoryCache;
pub use memory::MemoryCache;

/// Key/value store with per-entry expiry
#[async_trait]
pub trait CacheTier: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// `ttl = None` stores the entry without expiry
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every per-kind key held for `topic`.
    ///
    /// All keys are attempted; the last failure, if any, is returned.
    async fn delete_topic(&self, topic: &str) -> Result<()> {
        let mut outcome = Ok(());
        for key in keys::topic_keys(topic) {
            if let Err(e) = self.delete(&key).await {
                tracing::error!(key = %key, error = %e, "Cache delete failed");
                outcome = Err(e);
            }
        }
        outcome
    }

    async fn flush_all(&self) -> Result<()>;
}
