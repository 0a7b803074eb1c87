use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::AUDIT_PRIORITY;
use crate::domain::{AuditRecord, ResponseCompleteContext};
use crate::pipeline::{Plugin, PluginError};
use crate::ports::AuditRepository;

/// Records every exchange, with bodies capped at `max_body_bytes`.
pub struct AuditPlugin {
    repo: Arc<dyn AuditRepository>,
    max_body_bytes: usize,
}

impl AuditPlugin {
    pub fn new(repo: Arc<dyn AuditRepository>, max_body_bytes: usize) -> Self {
        Self {
            repo,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl Plugin for AuditPlugin {
    fn name(&self) -> &str {
        "audit"
    }

    fn priority(&self) -> i32 {
        AUDIT_PRIORITY
    }

    async fn on_response_complete(&self, ctx: &ResponseCompleteContext) -> Result<(), PluginError> {
        let request = &ctx.request;
        let record = AuditRecord {
            request_id: request.id,
            provider: request.provider.clone(),
            model: request.model.clone(),
            method: request.method.clone(),
            path: request.path.clone(),
            status: ctx.status,
            request_body: truncate(&request.body_text(), self.max_body_bytes),
            response_body: truncate(&ctx.text(), self.max_body_bytes),
            created_at: Utc::now(),
        };
        self.repo.record_exchange(&record).await?;
        Ok(())
    }
}

/// At most `max` bytes of `text`, cut on a character boundary.
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        // 'é' is two bytes; cutting inside it backs off.
        assert_eq!(truncate("aé", 2), "a");
    }
}
