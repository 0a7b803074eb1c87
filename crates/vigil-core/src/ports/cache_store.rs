//! Storage port for the encrypted response cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::RepositoryError;
use crate::domain::{CacheEntry, CacheStats};

/// Persistence for [`CacheEntry`] rows.
///
/// The store only ever sees ciphertext. Hit bookkeeping is a separate call
/// so the cache service can record a hit only after decryption succeeded.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry by key. No side effects.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, RepositoryError>;

    /// Insert or replace the entry with the same key.
    async fn set(&self, entry: &CacheEntry) -> Result<(), RepositoryError>;

    /// Increment the hit counter and set the last-hit time.
    async fn record_hit(&self, key: &str, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Entry count and summed hit counters.
    async fn stats(&self) -> Result<CacheStats, RepositoryError>;

    /// Keep the `keep_count` most recently used entries, delete the rest.
    ///
    /// Recency is the last-hit time, or the creation time for entries never
    /// hit, with creation time breaking ties. Returns the number deleted.
    async fn evict_oldest(&self, keep_count: u64) -> Result<u64, RepositoryError>;
}
