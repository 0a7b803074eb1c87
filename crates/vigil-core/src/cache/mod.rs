//! Encrypted, content-addressed response cache.
//!
//! Entries are keyed by `sha256(provider:model:body)` and stored through the
//! [`CacheStore`](crate::ports::CacheStore) port as AES-256-GCM ciphertext.
//! Anything that goes wrong on the read path (missing key, tampered row,
//! storage error) is a miss, never an error.

mod cipher;
mod service;

use thiserror::Error;

use crate::ports::RepositoryError;

pub use cipher::{CacheCipher, KEY_LEN};
pub use service::{ResponseCache, cache_key};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache cipher failure: {0}")]
    Crypto(String),

    #[error("Invalid cache key material: {0}")]
    InvalidKey(String),

    #[error("Cache key file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
