//! AES-256-GCM sealing for cached response bodies.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::info;

use super::CacheError;

/// Raw key length in bytes.
pub const KEY_LEN: usize = 32;

/// Output of [`CacheCipher::seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub auth_tag: Vec<u8>,
}

/// Process-wide cache cipher. Built once at startup and shared.
pub struct CacheCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl fmt::Debug for CacheCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheCipher").finish_non_exhaustive()
    }
}

impl CacheCipher {
    pub fn from_key(bytes: &[u8]) -> Result<Self, CacheError> {
        if bytes.len() != KEY_LEN {
            return Err(CacheError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let unbound = UnboundKey::new(&AES_256_GCM, bytes)
            .map_err(|_| CacheError::InvalidKey("rejected by AES-256-GCM".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Fresh random key, not persisted. Used by tests and ephemeral setups.
    pub fn generate() -> Result<Self, CacheError> {
        let bytes = random_key(&SystemRandom::new())?;
        Self::from_key(&bytes)
    }

    /// Load the installation key from `path`, creating it on first run.
    ///
    /// New key files are written with owner-only permissions on Unix.
    pub fn load_or_create(path: &Path) -> Result<Self, CacheError> {
        match fs::read(path) {
            Ok(bytes) => Self::from_key(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let bytes = random_key(&SystemRandom::new())?;
                write_key_file(path, &bytes)?;
                info!(path = %path.display(), "Generated new cache encryption key");
                Self::from_key(&bytes)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Encrypt `plaintext`, binding it to `aad` (the cache key).
    pub fn seal(&self, plaintext: &[u8], aad: &str) -> Result<Sealed, CacheError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CacheError::Crypto("nonce generation failed".to_string()))?;

        let mut in_out = plaintext.to_vec();
        let tag = self
            .key
            .seal_in_place_separate_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(aad.as_bytes()),
                &mut in_out,
            )
            .map_err(|_| CacheError::Crypto("seal failed".to_string()))?;

        Ok(Sealed {
            ciphertext: in_out,
            nonce: nonce_bytes.to_vec(),
            auth_tag: tag.as_ref().to_vec(),
        })
    }

    /// Decrypt and authenticate. Fails on any tampering or a different key.
    pub fn open(
        &self,
        ciphertext: &[u8],
        nonce: &[u8],
        auth_tag: &[u8],
        aad: &str,
    ) -> Result<Vec<u8>, CacheError> {
        let nonce = Nonce::try_assume_unique_for_key(nonce)
            .map_err(|_| CacheError::Crypto("bad nonce length".to_string()))?;

        let mut in_out = Vec::with_capacity(ciphertext.len() + auth_tag.len());
        in_out.extend_from_slice(ciphertext);
        in_out.extend_from_slice(auth_tag);

        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(aad.as_bytes()), &mut in_out)
            .map_err(|_| CacheError::Crypto("authentication failed".to_string()))?;
        Ok(plaintext.to_vec())
    }
}

fn random_key(rng: &SystemRandom) -> Result<[u8; KEY_LEN], CacheError> {
    let mut bytes = [0u8; KEY_LEN];
    rng.fill(&mut bytes)
        .map_err(|_| CacheError::Crypto("key generation failed".to_string()))?;
    Ok(bytes)
}

fn write_key_file(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}
