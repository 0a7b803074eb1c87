//! Composition utilities for building `Repos` with `SQLite` backends.
//!
//! Construction only; no domain logic lives here.

use sqlx::SqlitePool;
use std::sync::Arc;

use vigil_core::Repos;

use crate::repositories::{
    SqliteAuditRepository, SqliteCacheStore, SqliteRequestLogRepository, SqliteSettingsRepository,
};

/// Factory for creating repository instances with `SQLite` backends.
pub struct CoreFactory;

impl CoreFactory {
    /// Build all `SQLite` repositories from a pool.
    ///
    /// This is the recommended way for adapters to obtain repositories.
    pub fn build_repos(pool: SqlitePool) -> Repos {
        Repos::new(
            Arc::new(SqliteCacheStore::new(pool.clone())),
            Arc::new(SqliteRequestLogRepository::new(pool.clone())),
            Arc::new(SqliteAuditRepository::new(pool.clone())),
            Arc::new(SqliteSettingsRepository::new(pool)),
        )
    }

    /// Create a settings repository from a pool.
    pub fn settings_repository(pool: SqlitePool) -> Arc<SqliteSettingsRepository> {
        Arc::new(SqliteSettingsRepository::new(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup_test_database;

    #[tokio::test]
    async fn test_build_repos_shares_pool() {
        let pool = setup_test_database().await.unwrap();
        let repos = CoreFactory::build_repos(pool);

        let settings = repos.settings.load().await.unwrap();
        assert_eq!(settings, vigil_core::Settings::with_defaults());
        assert_eq!(repos.cache.stats().await.unwrap().total_entries, 0);
        assert_eq!(repos.request_log.summary().await.unwrap().total_requests, 0);
    }
}
