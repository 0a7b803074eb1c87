//! Side-channel tap on a streamed upstream response.
//!
//! Chunks are handed to the client exactly as they arrive. A copy of each
//! chunk goes over an unbounded channel to a tracked task that parses the
//! event stream and accumulates usage and text; when the upstream stream
//! ends (or the client goes away) that task runs the response phase.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use tokio::sync::mpsc;
use tracing::debug;
use vigil_core::{
    PluginPipeline, ProviderAdapter, RequestContext, ResponseCompleteContext, SseParser,
    StreamAccumulator,
};

/// Wrap `upstream` so its bytes are also fed to the stream interceptor.
pub fn tap_stream<S>(
    upstream: S,
    pipeline: Arc<PluginPipeline>,
    adapter: Arc<dyn ProviderAdapter>,
    ctx: RequestContext,
    status: u16,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Bytes>();

    let worker = Arc::clone(&pipeline);
    pipeline
        .tracker()
        .spawn(intercept(rx, worker, adapter, ctx, status));

    upstream
        .inspect(move |item| {
            if let Ok(chunk) = item {
                // The interceptor only goes away after this sender is dropped.
                let _ = tx.send(chunk.clone());
            }
        })
        .map_err(std::io::Error::other)
}

async fn intercept(
    mut rx: mpsc::UnboundedReceiver<Bytes>,
    pipeline: Arc<PluginPipeline>,
    adapter: Arc<dyn ProviderAdapter>,
    ctx: RequestContext,
    status: u16,
) {
    let mut parser = SseParser::new();
    let mut accumulator = StreamAccumulator::new(adapter);

    while let Some(chunk) = rx.recv().await {
        accumulator.extend(&parser.feed(&chunk));
    }
    accumulator.extend(&parser.flush());

    let summary = accumulator.finish();
    debug!(
        request_id = %ctx.id,
        events = summary.event_count,
        input_tokens = summary.usage.input_tokens,
        output_tokens = summary.usage.output_tokens,
        "Stream finished"
    );

    let complete = ResponseCompleteContext::streamed(ctx, status, summary.usage, summary.text);
    pipeline.run_response_phase(Arc::new(complete)).await;
}
