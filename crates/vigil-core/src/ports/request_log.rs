//! Request log port used by the metrics plugin.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{RequestLogRecord, RequestLogSummary};

#[async_trait]
pub trait RequestLogRepository: Send + Sync {
    async fn insert(&self, record: &RequestLogRecord) -> Result<(), RepositoryError>;

    async fn summary(&self) -> Result<RequestLogSummary, RepositoryError>;
}
