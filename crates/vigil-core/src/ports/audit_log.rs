//! Audit log port.
//!
//! Written by the audit plugin (exchanges) and the DLP plugin (detections).

use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::{AuditRecord, DetectionRecord};

#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Record one request/response exchange.
    async fn record_exchange(&self, record: &AuditRecord) -> Result<(), RepositoryError>;

    /// Record a detection. Only pattern names and counts are stored.
    async fn record_detection(&self, record: &DetectionRecord) -> Result<(), RepositoryError>;

    /// Most recent exchanges, newest first.
    async fn recent_exchanges(&self, limit: u32) -> Result<Vec<AuditRecord>, RepositoryError>;

    /// Detections recorded for one request.
    async fn detections_for(&self, request_id: Uuid)
    -> Result<Vec<DetectionRecord>, RepositoryError>;
}
