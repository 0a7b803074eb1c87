//! `SQLite` implementation of the `CacheStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use vigil_core::{CacheEntry, CacheStats, CacheStore, RepositoryError, Usage};

use super::row_mappers::{from_millis, storage_err, to_i64, to_millis, to_u64};

/// Encrypted response rows. Ciphertext, nonce and tag are stored as blobs;
/// this layer never sees plaintext.
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<CacheEntry, RepositoryError> {
    let last_hit_at: Option<i64> = row.try_get("last_hit_at").map_err(storage_err)?;

    Ok(CacheEntry {
        key: row.try_get("key").map_err(storage_err)?,
        provider: row.try_get("provider").map_err(storage_err)?,
        model: row.try_get("model").map_err(storage_err)?,
        ciphertext: row.try_get("ciphertext").map_err(storage_err)?,
        nonce: row.try_get("nonce").map_err(storage_err)?,
        auth_tag: row.try_get("auth_tag").map_err(storage_err)?,
        usage: Usage {
            input_tokens: to_u64(row.try_get("input_tokens").map_err(storage_err)?),
            output_tokens: to_u64(row.try_get("output_tokens").map_err(storage_err)?),
            cache_creation_tokens: to_u64(
                row.try_get("cache_creation_tokens").map_err(storage_err)?,
            ),
            cache_read_tokens: to_u64(row.try_get("cache_read_tokens").map_err(storage_err)?),
        },
        created_at: from_millis(row.try_get("created_at").map_err(storage_err)?)?,
        last_hit_at: last_hit_at.map(from_millis).transpose()?,
        hit_count: to_u64(row.try_get("hit_count").map_err(storage_err)?),
    })
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT key, provider, model, ciphertext, nonce, auth_tag,
                   input_tokens, output_tokens, cache_creation_tokens, cache_read_tokens,
                   created_at, last_hit_at, hit_count
            FROM response_cache WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.as_ref().map(row_to_entry).transpose()
    }

    async fn set(&self, entry: &CacheEntry) -> Result<(), RepositoryError> {
        // Re-storing a key replaces the payload and resets its hit history.
        sqlx::query(
            r#"
            INSERT INTO response_cache (
                key, provider, model, ciphertext, nonce, auth_tag,
                input_tokens, output_tokens, cache_creation_tokens, cache_read_tokens,
                created_at, last_hit_at, hit_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                ciphertext = excluded.ciphertext,
                nonce = excluded.nonce,
                auth_tag = excluded.auth_tag,
                input_tokens = excluded.input_tokens,
                output_tokens = excluded.output_tokens,
                cache_creation_tokens = excluded.cache_creation_tokens,
                cache_read_tokens = excluded.cache_read_tokens,
                created_at = excluded.created_at,
                last_hit_at = excluded.last_hit_at,
                hit_count = excluded.hit_count
            "#,
        )
        .bind(&entry.key)
        .bind(&entry.provider)
        .bind(&entry.model)
        .bind(&entry.ciphertext)
        .bind(&entry.nonce)
        .bind(&entry.auth_tag)
        .bind(to_i64(entry.usage.input_tokens))
        .bind(to_i64(entry.usage.output_tokens))
        .bind(to_i64(entry.usage.cache_creation_tokens))
        .bind(to_i64(entry.usage.cache_read_tokens))
        .bind(to_millis(entry.created_at))
        .bind(entry.last_hit_at.map(to_millis))
        .bind(to_i64(entry.hit_count))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn record_hit(&self, key: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE response_cache SET hit_count = hit_count + 1, last_hit_at = ? WHERE key = ?",
        )
        .bind(to_millis(at))
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, RepositoryError> {
        let (entries, hits): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(hit_count), 0) FROM response_cache",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(CacheStats {
            total_entries: to_u64(entries),
            total_hits: to_u64(hits),
        })
    }

    async fn evict_oldest(&self, keep_count: u64) -> Result<u64, RepositoryError> {
        // Recency is the last hit, or creation for entries never hit.
        let result = sqlx::query(
            r#"
            DELETE FROM response_cache WHERE key NOT IN (
                SELECT key FROM response_cache
                ORDER BY COALESCE(last_hit_at, created_at) DESC, created_at DESC
                LIMIT ?
            )
            "#,
        )
        .bind(to_i64(keep_count))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup_test_database;
    use chrono::Duration;

    fn entry(key: &str, created_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            ciphertext: vec![1, 2, 3],
            nonce: vec![0; 12],
            auth_tag: vec![9; 16],
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
                cache_creation_tokens: 30,
                cache_read_tokens: 40,
            },
            created_at,
            last_hit_at: None,
            hit_count: 0,
        }
    }

    async fn store() -> SqliteCacheStore {
        SqliteCacheStore::new(setup_test_database().await.unwrap())
    }

    #[tokio::test]
    async fn test_set_get_and_hit() {
        let store = store().await;
        assert!(store.get("k").await.unwrap().is_none());

        let now = Utc::now();
        store.set(&entry("k", now)).await.unwrap();
        store.record_hit("k", now + Duration::seconds(1)).await.unwrap();

        let loaded = store.get("k").await.unwrap().unwrap();
        assert_eq!(loaded.ciphertext, vec![1, 2, 3]);
        assert_eq!(loaded.auth_tag, vec![9; 16]);
        assert_eq!(loaded.usage.input_tokens, 10);
        assert_eq!(loaded.usage.cache_creation_tokens, 30);
        assert_eq!(loaded.usage.cache_read_tokens, 40);
        assert_eq!(loaded.hit_count, 1);
        assert!(loaded.last_hit_at.is_some());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_hits, 1);
    }

    #[tokio::test]
    async fn test_evict_keeps_most_recently_used() {
        let store = store().await;
        let base = Utc::now() - Duration::hours(1);

        store.set(&entry("old", base)).await.unwrap();
        store.set(&entry("mid", base + Duration::minutes(1))).await.unwrap();
        store.set(&entry("new", base + Duration::minutes(2))).await.unwrap();
        // A hit makes the oldest entry the most recently used.
        store.record_hit("old", base + Duration::minutes(3)).await.unwrap();

        let deleted = store.evict_oldest(2).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get("old").await.unwrap().is_some());
        assert!(store.get("new").await.unwrap().is_some());
        assert!(store.get("mid").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evict_with_room_deletes_nothing() {
        let store = store().await;
        store.set(&entry("a", Utc::now())).await.unwrap();
        assert_eq!(store.evict_oldest(10).await.unwrap(), 0);
        assert_eq!(store.evict_oldest(0).await.unwrap(), 1);
    }
}
