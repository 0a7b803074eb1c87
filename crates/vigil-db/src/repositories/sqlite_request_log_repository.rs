//! `SQLite` implementation of the `RequestLogRepository` trait.

use async_trait::async_trait;
use sqlx::SqlitePool;

use vigil_core::{RepositoryError, RequestLogRecord, RequestLogRepository, RequestLogSummary};

use super::row_mappers::{storage_err, to_i64, to_millis, to_u64};

pub struct SqliteRequestLogRepository {
    pool: SqlitePool,
}

impl SqliteRequestLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestLogRepository for SqliteRequestLogRepository {
    async fn insert(&self, record: &RequestLogRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO request_log (
                request_id, provider, model, method, path, status, streaming,
                short_circuited, latency_ms, input_tokens, output_tokens,
                cache_creation_tokens, cache_read_tokens, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.request_id.to_string())
        .bind(&record.provider)
        .bind(&record.model)
        .bind(&record.method)
        .bind(&record.path)
        .bind(i64::from(record.status))
        .bind(record.streaming)
        .bind(record.short_circuited)
        .bind(to_i64(record.latency_ms))
        .bind(to_i64(record.usage.input_tokens))
        .bind(to_i64(record.usage.output_tokens))
        .bind(to_i64(record.usage.cache_creation_tokens))
        .bind(to_i64(record.usage.cache_read_tokens))
        .bind(to_millis(record.created_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn summary(&self) -> Result<RequestLogSummary, RepositoryError> {
        let (total, input, output, short_circuited): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(input_tokens), 0),
                   COALESCE(SUM(output_tokens), 0),
                   COALESCE(SUM(short_circuited), 0)
            FROM request_log
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(RequestLogSummary {
            total_requests: to_u64(total),
            input_tokens: to_u64(input),
            output_tokens: to_u64(output),
            short_circuited: to_u64(short_circuited),
        })
    }
}
