//! Response cache domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Usage;

/// A stored, encrypted response.
///
/// The plaintext never reaches storage: `ciphertext`, `nonce` and
/// `auth_tag` are the output of the cache cipher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Hex SHA-256 of `provider:model:body`.
    pub key: String,
    pub provider: String,
    pub model: String,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub auth_tag: Vec<u8>,
    /// Token counts of the original upstream response.
    pub usage: Usage,
    pub created_at: DateTime<Utc>,
    pub last_hit_at: Option<DateTime<Utc>>,
    pub hit_count: u64,
}

/// A decrypted cache hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub key: String,
    pub body: Vec<u8>,
    pub usage: Usage,
    pub hit_count: u64,
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: u64,
    pub total_hits: u64,
}
