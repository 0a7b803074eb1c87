//! `SQLite` implementation of the `AuditRepository` trait.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use vigil_core::{
    AuditRecord, AuditRepository, DetectionRecord, Direction, DlpAction, RepositoryError,
};

use super::row_mappers::{from_millis, parse_uuid, storage_err, to_millis};

pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_exchange(row: &sqlx::sqlite::SqliteRow) -> Result<AuditRecord, RepositoryError> {
    let request_id: String = row.try_get("request_id").map_err(storage_err)?;
    let status: i64 = row.try_get("status").map_err(storage_err)?;

    Ok(AuditRecord {
        request_id: parse_uuid(&request_id)?,
        provider: row.try_get("provider").map_err(storage_err)?,
        model: row.try_get("model").map_err(storage_err)?,
        method: row.try_get("method").map_err(storage_err)?,
        path: row.try_get("path").map_err(storage_err)?,
        status: u16::try_from(status)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        request_body: row.try_get("request_body").map_err(storage_err)?,
        response_body: row.try_get("response_body").map_err(storage_err)?,
        created_at: from_millis(row.try_get("created_at").map_err(storage_err)?)?,
    })
}

fn row_to_detection(row: &sqlx::sqlite::SqliteRow) -> Result<DetectionRecord, RepositoryError> {
    let request_id: String = row.try_get("request_id").map_err(storage_err)?;
    let direction: String = row.try_get("direction").map_err(storage_err)?;
    let action: String = row.try_get("action").map_err(storage_err)?;
    let findings: String = row.try_get("findings_json").map_err(storage_err)?;

    // Enum columns hold the serde names, so decode them the same way.
    let decode = |e: serde_json::Error| RepositoryError::Serialization(e.to_string());
    Ok(DetectionRecord {
        request_id: parse_uuid(&request_id)?,
        provider: row.try_get("provider").map_err(storage_err)?,
        direction: serde_json::from_value::<Direction>(direction.into()).map_err(decode)?,
        action: serde_json::from_value::<DlpAction>(action.into()).map_err(decode)?,
        findings: serde_json::from_str(&findings).map_err(decode)?,
        created_at: from_millis(row.try_get("created_at").map_err(storage_err)?)?,
    })
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn record_exchange(&self, record: &AuditRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO audit_exchanges (
                request_id, provider, model, method, path, status,
                request_body, response_body, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.request_id.to_string())
        .bind(&record.provider)
        .bind(&record.model)
        .bind(&record.method)
        .bind(&record.path)
        .bind(i64::from(record.status))
        .bind(&record.request_body)
        .bind(&record.response_body)
        .bind(to_millis(record.created_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn record_detection(&self, record: &DetectionRecord) -> Result<(), RepositoryError> {
        let findings = serde_json::to_string(&record.findings)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO audit_detections (
                request_id, provider, direction, action, findings_json, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.request_id.to_string())
        .bind(&record.provider)
        .bind(record.direction.as_str())
        .bind(record.action.as_str())
        .bind(&findings)
        .bind(to_millis(record.created_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn recent_exchanges(&self, limit: u32) -> Result<Vec<AuditRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT request_id, provider, model, method, path, status,
                   request_body, response_body, created_at
            FROM audit_exchanges
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(row_to_exchange).collect()
    }

    async fn detections_for(
        &self,
        request_id: Uuid,
    ) -> Result<Vec<DetectionRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT request_id, provider, direction, action, findings_json, created_at
            FROM audit_detections
            WHERE request_id = ?
            ORDER BY id
            "#,
        )
        .bind(request_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(row_to_detection).collect()
    }
}
