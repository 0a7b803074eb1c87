use std::sync::Arc;

use async_trait::async_trait;

use super::METRICS_PRIORITY;
use crate::domain::{RequestLogRecord, ResponseCompleteContext, ResponseSource};
use crate::pipeline::{Plugin, PluginError};
use crate::ports::RequestLogRepository;

/// Writes one request-log row per completed exchange.
pub struct MetricsPlugin {
    repo: Arc<dyn RequestLogRepository>,
}

impl MetricsPlugin {
    pub fn new(repo: Arc<dyn RequestLogRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Plugin for MetricsPlugin {
    fn name(&self) -> &str {
        "metrics"
    }

    fn priority(&self) -> i32 {
        METRICS_PRIORITY
    }

    async fn on_response_complete(&self, ctx: &ResponseCompleteContext) -> Result<(), PluginError> {
        let request = &ctx.request;
        let record = RequestLogRecord {
            request_id: request.id,
            provider: request.provider.clone(),
            model: request.model.clone(),
            method: request.method.clone(),
            path: request.path.clone(),
            status: ctx.status,
            streaming: ctx.streaming,
            short_circuited: matches!(ctx.source, ResponseSource::ShortCircuit { .. }),
            latency_ms: u64::try_from(ctx.latency.as_millis()).unwrap_or(u64::MAX),
            usage: ctx.usage,
            created_at: request.received_at,
        };
        self.repo.insert(&record).await?;
        Ok(())
    }
}
