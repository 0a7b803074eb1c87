//! Database and key file locations.

use std::path::{Path, PathBuf};

use super::error::PathError;
use super::platform::{data_root, ensure_directory};

const DATABASE_FILE: &str = "vigil.db";
const CACHE_KEY_FILE: &str = "cache.key";

/// Path to the `SQLite` database under the default data root.
pub fn database_path() -> Result<PathBuf, PathError> {
    database_path_in(&data_root()?)
}

/// Path to the `SQLite` database under `root` (`<root>/data/vigil.db`).
///
/// The `data/` subdirectory is created if it doesn't exist.
pub fn database_path_in(root: &Path) -> Result<PathBuf, PathError> {
    let data_dir = root.join("data");
    ensure_directory(&data_dir)?;
    Ok(data_dir.join(DATABASE_FILE))
}

/// Path to the cache encryption key under the default data root.
pub fn cache_key_path() -> Result<PathBuf, PathError> {
    cache_key_path_in(&data_root()?)
}

/// Path to the cache encryption key under `root` (`<root>/keys/cache.key`).
pub fn cache_key_path_in(root: &Path) -> Result<PathBuf, PathError> {
    let key_dir = root.join("keys");
    ensure_directory(&key_dir)?;
    Ok(key_dir.join(CACHE_KEY_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_under_root() {
        let temp = tempfile::tempdir().unwrap();
        let db = database_path_in(temp.path()).unwrap();
        let key = cache_key_path_in(temp.path()).unwrap();

        assert!(db.ends_with("data/vigil.db"));
        assert!(key.ends_with("keys/cache.key"));
        assert!(db.parent().unwrap().is_dir());
        assert!(key.parent().unwrap().is_dir());
    }
}
