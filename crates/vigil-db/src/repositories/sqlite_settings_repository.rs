//! `SQLite` implementation of the `SettingsRepository` trait.
//!
//! Settings live in a single row of `gateway_settings`, tagged with the
//! layout version that wrote them. Rows from a newer build are refused
//! rather than half-read, and both directions run `validate_settings` so a
//! hand-edited database cannot start the gateway with an unusable config.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use vigil_core::{RepositoryError, Settings, SettingsRepository, validate_settings};

use super::row_mappers::{storage_err, to_millis};

/// Layout version of the serialized `Settings` document.
pub const SETTINGS_SCHEMA_VERSION: i64 = 1;

pub struct SqliteSettingsRepository {
    pool: SqlitePool,
}

impl SqliteSettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn invalid(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Constraint(format!("invalid gateway settings: {e}"))
}

#[async_trait]
impl SettingsRepository for SqliteSettingsRepository {
    async fn load(&self) -> Result<Settings, RepositoryError> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT schema_version, body FROM gateway_settings WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?;

        let Some((version, body)) = row else {
            debug!("No stored gateway settings; using defaults");
            return Ok(Settings::with_defaults());
        };

        if version > SETTINGS_SCHEMA_VERSION {
            return Err(RepositoryError::Constraint(format!(
                "settings written by layout version {version}, this build reads up to {SETTINGS_SCHEMA_VERSION}"
            )));
        }

        let settings: Settings = serde_json::from_str(&body)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        validate_settings(&settings).map_err(invalid)?;
        Ok(settings)
    }

    async fn save(&self, settings: &Settings) -> Result<(), RepositoryError> {
        validate_settings(settings).map_err(invalid)?;
        let body = serde_json::to_string(settings)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO gateway_settings (id, schema_version, body, updated_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                schema_version = excluded.schema_version,
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(SETTINGS_SCHEMA_VERSION)
        .bind(&body)
        .bind(to_millis(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup_test_database;
    use vigil_core::{DlpAction, FailMode};

    async fn repo() -> (SqliteSettingsRepository, SqlitePool) {
        let pool = setup_test_database().await.unwrap();
        (SqliteSettingsRepository::new(pool.clone()), pool)
    }

    #[tokio::test]
    async fn test_load_returns_defaults_when_empty() {
        let (repo, _) = repo().await;
        assert_eq!(repo.load().await.unwrap(), Settings::with_defaults());
    }

    #[tokio::test]
    async fn test_save_overwrites_single_row() {
        let (repo, pool) = repo().await;

        let mut settings = Settings {
            fail_mode: Some(FailMode::Closed),
            proxy_port: Some(9090),
            ..Settings::with_defaults()
        };
        settings.dlp.action = DlpAction::Block;
        repo.save(&settings).await.unwrap();

        settings.proxy_port = Some(9091);
        repo.save(&settings).await.unwrap();

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded.fail_mode, Some(FailMode::Closed));
        assert_eq!(loaded.proxy_port, Some(9091));
        assert_eq!(loaded.dlp.action, DlpAction::Block);

        let (rows, version): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), MAX(schema_version) FROM gateway_settings")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!((rows, version), (1, SETTINGS_SCHEMA_VERSION));
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_settings() {
        let (repo, _) = repo().await;
        let settings = Settings {
            proxy_port: Some(80),
            ..Settings::with_defaults()
        };
        let err = repo.save(&settings).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Constraint(_)));
        assert_eq!(repo.load().await.unwrap(), Settings::with_defaults());
    }

    #[tokio::test]
    async fn test_load_rejects_hand_edited_invalid_row() {
        let (repo, pool) = repo().await;
        let body = serde_json::to_string(&Settings {
            plugin_timeout_ms: Some(0),
            ..Settings::with_defaults()
        })
        .unwrap();
        sqlx::query("INSERT INTO gateway_settings (id, schema_version, body, updated_at) VALUES (1, 1, ?, 0)")
            .bind(body)
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(repo.load().await, Err(RepositoryError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_load_refuses_newer_layout() {
        let (repo, pool) = repo().await;
        sqlx::query("INSERT INTO gateway_settings (id, schema_version, body, updated_at) VALUES (1, 99, '{}', 0)")
            .execute(&pool)
            .await
            .unwrap();

        let err = repo.load().await.unwrap_err();
        assert!(err.to_string().contains("layout version 99"));
    }

    #[tokio::test]
    async fn test_load_reports_corrupt_body() {
        let (repo, pool) = repo().await;
        sqlx::query("INSERT INTO gateway_settings (id, schema_version, body, updated_at) VALUES (1, 1, 'not json', 0)")
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(repo.load().await, Err(RepositoryError::Serialization(_))));
    }
}
