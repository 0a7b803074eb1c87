use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::CACHE_PRIORITY;
use crate::cache::ResponseCache;
use crate::domain::{RequestContext, ResponseCompleteContext, ResponseSource};
use crate::events::GatewayEvent;
use crate::pipeline::{Plugin, PluginError, PluginOutcome, ShortCircuitResponse};
use crate::ports::GatewayEventEmitter;
use crate::providers::{ProviderRegistry, RouteFilter};

/// Header set on responses served from the cache.
pub const CACHE_HEADER: &str = "x-vigil-cache";

/// Serves repeated non-streaming LLM requests from the encrypted cache.
pub struct CachePlugin {
    cache: ResponseCache,
    registry: Arc<ProviderRegistry>,
    max_entries: u64,
    emitter: Arc<dyn GatewayEventEmitter>,
}

impl CachePlugin {
    pub fn new(
        cache: ResponseCache,
        registry: Arc<ProviderRegistry>,
        max_entries: u64,
        emitter: Arc<dyn GatewayEventEmitter>,
    ) -> Self {
        Self {
            cache,
            registry,
            max_entries,
            emitter,
        }
    }

    fn cacheable(&self, ctx: &RequestContext) -> bool {
        !ctx.streaming
            && !ctx.body.is_empty()
            && self
                .registry
                .resolve_route(&ctx.path, RouteFilter::LlmOnly)
                .is_some()
    }
}

#[async_trait]
impl Plugin for CachePlugin {
    fn name(&self) -> &str {
        "cache"
    }

    fn priority(&self) -> i32 {
        CACHE_PRIORITY
    }

    async fn on_request(&self, ctx: &RequestContext) -> Result<PluginOutcome, PluginError> {
        if !self.cacheable(ctx) {
            return Ok(PluginOutcome::Continue);
        }
        let Some(hit) = self.cache.get(&ctx.provider, &ctx.model, &ctx.body).await else {
            return Ok(PluginOutcome::Continue);
        };

        self.emitter.emit(GatewayEvent::CacheHit {
            request_id: ctx.id,
            provider: ctx.provider.clone(),
            model: ctx.model.clone(),
        });
        Ok(PluginOutcome::ShortCircuit(
            ShortCircuitResponse::json(200, hit.body).with_header(CACHE_HEADER, "hit"),
        ))
    }

    async fn on_response_complete(&self, ctx: &ResponseCompleteContext) -> Result<(), PluginError> {
        if ctx.source != ResponseSource::Upstream
            || !ctx.is_success()
            || ctx.streaming
            || !self.cacheable(&ctx.request)
        {
            return Ok(());
        }

        let request = &ctx.request;
        self.cache
            .set(&request.provider, &request.model, &request.body, &ctx.body, &ctx.usage)
            .await?;
        let evicted = self.cache.evict_oldest(self.max_entries).await?;
        debug!(request_id = %request.id, evicted, "Stored response in cache");

        self.emitter.emit(GatewayEvent::CacheStored {
            request_id: request.id,
            provider: request.provider.clone(),
            model: request.model.clone(),
            evicted,
        });
        Ok(())
    }
}
