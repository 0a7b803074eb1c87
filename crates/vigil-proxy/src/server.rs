//! Axum HTTP server for the gateway.
//!
//! Admin routes live under `/_vigil`; every other path is proxied.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_core::{
    GatewayEvent, GatewayEventEmitter, RequestContext, RequestPhaseOutcome, RouteFilter,
};

use crate::error::GatewayError;
use crate::forward::{forward_upstream, short_circuit_response};
use crate::state::AppState;

/// Response header carrying the gateway's request id.
pub const REQUEST_ID_HEADER: &str = "x-vigil-request-id";

/// Build the gateway router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/_vigil/stats", get(stats))
        .route("/_vigil/events", get(events))
        .fallback(proxy)
        .with_state(state)
}

/// Run the gateway on a pre-bound listener until `cancel` fires.
///
/// After the listener stops, in-flight plugin work gets the configured
/// grace period to finish.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("Gateway listening on http://{addr}");
    info!("Point clients at http://{addr}/anthropic, /openai, /gemini, ...");

    let pipeline = Arc::clone(&state.pipeline);
    let grace = state.settings.effective_shutdown_grace();

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Gateway stopped accepting requests, draining plugin work");
    if !pipeline.shutdown(grace).await {
        warn!("Abandoning plugin work still running after the grace period");
    }
    Ok(())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, GatewayError> {
    let cache = state.repos.cache.stats().await?;
    let requests = state.repos.request_log.summary().await?;
    Ok(Json(serde_json::json!({
        "cache": cache,
        "requests": requests,
        "plugins": state.pipeline.plugin_names(),
        "eventSubscribers": state.events.subscriber_count(),
    })))
}

async fn events(State(state): State<AppState>) -> impl IntoResponse {
    Arc::clone(&state.events).subscribe()
}

/// Catch-all proxy handler.
async fn proxy(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle_proxy(&state, &method, &uri, &headers, body).await {
        Ok(response) => response,
        Err(e) => {
            debug!(method = %method, path = %uri, "Gateway error: {e}");
            e.into_response()
        }
    }
}

async fn handle_proxy(
    state: &AppState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());

    let route = state
        .registry
        .resolve_route(path, RouteFilter::All)
        .ok_or_else(|| GatewayError::RouteMiss(uri.path().to_string()))?;

    let ctx = RequestContext::new(
        route.adapter.as_ref(),
        method.as_str(),
        path,
        header_map(headers),
        body,
    );
    let request_id = ctx.id;

    info!(
        request_id = %request_id,
        provider = %ctx.provider,
        model = %ctx.model,
        prefix = %route.matched_prefix,
        streaming = ctx.streaming,
        "Routed request"
    );
    state.events.emit(GatewayEvent::RequestRouted {
        request_id,
        provider: ctx.provider.clone(),
        model: ctx.model.clone(),
        path: ctx.path.clone(),
    });

    let mut response = match state.pipeline.run_request_phase(ctx).await {
        RequestPhaseOutcome::Proceed { ctx, .. } => forward_upstream(state, &route, ctx).await?,
        RequestPhaseOutcome::ShortCircuit {
            ctx,
            plugin,
            response,
        } => short_circuit_response(state, route.adapter.as_ref(), ctx, plugin, response),
        RequestPhaseOutcome::Blocked { plugin, reason, .. } => {
            return Err(GatewayError::Blocked { plugin, reason });
        }
        RequestPhaseOutcome::Failed { fault, .. } => return Err(GatewayError::Pipeline(fault)),
    };

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    Ok(response)
}

/// Lowercased header map. Repeated headers are joined with `, `.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}
