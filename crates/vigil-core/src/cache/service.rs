//! Cache lookups and fills on top of the storage port.

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{CacheCipher, CacheError};
use crate::domain::{CacheEntry, CacheStats, CachedResponse, Usage};
use crate::ports::CacheStore;

/// Deterministic cache key: hex SHA-256 of `provider:model:body`.
pub fn cache_key(provider: &str, model: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());
    hasher.update(b":");
    hasher.update(model.as_bytes());
    hasher.update(b":");
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Exact-match response cache.
///
/// Whether a request is cacheable at all (streaming, provider class) is the
/// caller's decision.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    cipher: Arc<CacheCipher>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, cipher: Arc<CacheCipher>) -> Self {
        Self { store, cipher }
    }

    /// Look up a cached response. Never fails: storage and decryption
    /// problems are logged and reported as a miss.
    pub async fn get(&self, provider: &str, model: &str, body: &[u8]) -> Option<CachedResponse> {
        let key = cache_key(provider, model, body);

        let entry = match self.store.get(&key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed; treating as miss");
                return None;
            }
        };

        let plaintext =
            match self
                .cipher
                .open(&entry.ciphertext, &entry.nonce, &entry.auth_tag, &key)
            {
                Ok(plaintext) => plaintext,
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache entry failed to decrypt; treating as miss");
                    return None;
                }
            };

        if let Err(e) = self.store.record_hit(&key, Utc::now()).await {
            warn!(key = %key, error = %e, "Failed to record cache hit");
        }
        debug!(key = %key, provider, model, "Cache hit");

        Some(CachedResponse {
            key,
            body: plaintext,
            usage: entry.usage,
            hit_count: entry.hit_count + 1,
        })
    }

    /// Encrypt and store `response` for this request. Returns the key.
    pub async fn set(
        &self,
        provider: &str,
        model: &str,
        body: &[u8],
        response: &[u8],
        usage: &Usage,
    ) -> Result<String, CacheError> {
        let key = cache_key(provider, model, body);
        let sealed = self.cipher.seal(response, &key)?;

        let entry = CacheEntry {
            key: key.clone(),
            provider: provider.to_string(),
            model: model.to_string(),
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce,
            auth_tag: sealed.auth_tag,
            usage: *usage,
            created_at: Utc::now(),
            last_hit_at: None,
            hit_count: 0,
        };
        self.store.set(&entry).await?;
        Ok(key)
    }

    /// Keep the `keep_count` most recently used entries and delete the rest.
    pub async fn evict_oldest(&self, keep_count: u64) -> Result<u64, CacheError> {
        Ok(self.store.evict_oldest(keep_count).await?)
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(self.store.stats().await?)
    }
}
