use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::OPTIMIZER_PRIORITY;
use crate::domain::RequestContext;
use crate::events::GatewayEvent;
use crate::optimizer::optimize_request_body;
use crate::pipeline::{Plugin, PluginError, PluginOutcome};
use crate::ports::GatewayEventEmitter;
use crate::providers::{ProviderRegistry, RouteFilter};

/// Trims redundant whitespace out of LLM prompts.
pub struct OptimizerPlugin {
    registry: Arc<ProviderRegistry>,
    emitter: Arc<dyn GatewayEventEmitter>,
}

impl OptimizerPlugin {
    pub fn new(registry: Arc<ProviderRegistry>, emitter: Arc<dyn GatewayEventEmitter>) -> Self {
        Self { registry, emitter }
    }
}

#[async_trait]
impl Plugin for OptimizerPlugin {
    fn name(&self) -> &str {
        "optimizer"
    }

    fn priority(&self) -> i32 {
        OPTIMIZER_PRIORITY
    }

    async fn on_request(&self, ctx: &RequestContext) -> Result<PluginOutcome, PluginError> {
        if self.registry.resolve_route(&ctx.path, RouteFilter::LlmOnly).is_none() {
            return Ok(PluginOutcome::Continue);
        }
        let Some(parsed) = ctx.parsed_body.as_deref() else {
            return Ok(PluginOutcome::Continue);
        };

        let mut body = parsed.clone();
        let saved_chars = optimize_request_body(&mut body);
        if saved_chars == 0 {
            return Ok(PluginOutcome::Continue);
        }

        let body = serde_json::to_string(&body)
            .map_err(|e| PluginError::Internal(format!("failed to serialize body: {e}")))?;
        debug!(request_id = %ctx.id, saved_chars, "Trimmed prompt whitespace");
        self.emitter.emit(GatewayEvent::PromptOptimized {
            request_id: ctx.id,
            saved_chars,
        });
        Ok(PluginOutcome::ModifiedBody(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NoopEmitter;
    use crate::providers::ProviderAdapter;
    use bytes::Bytes;
    use std::collections::BTreeMap;

    fn run(path: &str, body: &str) -> RequestContext {
        let registry = ProviderRegistry::with_defaults();
        let adapter: Arc<dyn ProviderAdapter> = registry
            .resolve_route(path, RouteFilter::All)
            .unwrap()
            .adapter;
        RequestContext::new(
            adapter.as_ref(),
            "POST",
            path,
            BTreeMap::new(),
            Bytes::from(body.to_string()),
        )
    }

    fn plugin() -> OptimizerPlugin {
        OptimizerPlugin::new(
            Arc::new(ProviderRegistry::with_defaults()),
            Arc::new(NoopEmitter::new()),
        )
    }

    #[tokio::test]
    async fn test_llm_prompt_is_trimmed() {
        let ctx = run(
            "/v1/messages",
            r#"{"model":"claude","messages":[{"role":"user","content":"hello    world"}]}"#,
        );
        let PluginOutcome::ModifiedBody(body) = plugin().on_request(&ctx).await.unwrap() else {
            panic!("expected rewrite");
        };
        assert!(body.contains("\"hello world\""));
    }

    #[tokio::test]
    async fn test_messaging_traffic_is_untouched() {
        let ctx = run("/slack/chat.postMessage", r#"{"text":"hello    world"}"#);
        assert_eq!(plugin().on_request(&ctx).await.unwrap(), PluginOutcome::Continue);
    }

    #[tokio::test]
    async fn test_tidy_prompt_is_untouched() {
        let ctx = run(
            "/v1/messages",
            r#"{"model":"claude","messages":[{"role":"user","content":"hello world"}]}"#,
        );
        assert_eq!(plugin().on_request(&ctx).await.unwrap(), PluginOutcome::Continue);
    }
}
