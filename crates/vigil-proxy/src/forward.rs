//! Upstream forwarding with streaming support.
//!
//! Builds the upstream request from the (possibly plugin-modified) request
//! context, sends it, and turns the upstream reply into the client
//! response. Event-stream replies are passed through chunk by chunk with
//! the stream tap attached; everything else is buffered so the response
//! phase sees the full body.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};
use vigil_core::{
    ProviderAdapter, RequestContext, ResponseCompleteContext, ResponseSource, RouteMatch,
    ShortCircuitResponse,
};

use crate::bootstrap::GatewayContext;
use crate::error::GatewayError;
use crate::stream_tap::tap_stream;

/// Response headers that are never copied back to the client.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    // Recomputed by the server for the body we actually send
    "content-length",
];

fn should_return_header(name: &str) -> bool {
    !HOP_BY_HOP_HEADERS.contains(&name)
}

/// Full upstream URL: base (or configured override) plus the routed path.
pub fn upstream_url(state: &GatewayContext, route: &RouteMatch) -> String {
    let base = state.upstream_base(route.adapter.name(), route.adapter.base_url());
    format!("{}{}", base.trim_end_matches('/'), route.upstream_path)
}

/// Forward `ctx` upstream and build the client response.
pub async fn forward_upstream(
    state: &GatewayContext,
    route: &RouteMatch,
    ctx: RequestContext,
) -> Result<Response, GatewayError> {
    let url = upstream_url(state, route);
    let method = Method::from_bytes(ctx.method.as_bytes())
        .map_err(|e| GatewayError::BadRequest(e.to_string()))?;
    let adapter = Arc::clone(&route.adapter);

    let mut builder = state.client.request(method, &url);
    for (name, value) in adapter.transform_headers(&ctx.headers) {
        builder = builder.header(name, value);
    }
    if !ctx.body.is_empty() {
        builder = builder.body(ctx.body.clone());
    }

    debug!(request_id = %ctx.id, upstream = %url, streaming = ctx.streaming, "Forwarding upstream");

    let upstream = builder.send().await.map_err(|e| {
        warn!(request_id = %ctx.id, upstream = %url, "Upstream request failed: {e}");
        GatewayError::Upstream(e.to_string())
    })?;

    let status = upstream.status();
    let headers = return_headers(upstream.headers());

    if is_event_stream(upstream.headers()) {
        let body = tap_stream(
            upstream.bytes_stream(),
            Arc::clone(&state.pipeline),
            adapter,
            ctx,
            status.as_u16(),
        );
        let mut response = Response::new(Body::from_stream(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        // Disable buffering in reverse proxies in front of the gateway
        response
            .headers_mut()
            .insert("x-accel-buffering", HeaderValue::from_static("no"));
        return Ok(response);
    }

    let body = upstream.bytes().await.map_err(|e| {
        warn!(request_id = %ctx.id, "Failed to read upstream response: {e}");
        GatewayError::Upstream(e.to_string())
    })?;

    state.pipeline.spawn_response_phase(ResponseCompleteContext::buffered(
        ctx,
        adapter.as_ref(),
        status.as_u16(),
        body.clone(),
        ResponseSource::Upstream,
    ));

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Client response for a plugin short-circuit. The response phase still runs.
pub fn short_circuit_response(
    state: &GatewayContext,
    adapter: &dyn ProviderAdapter,
    ctx: RequestContext,
    plugin: String,
    response: ShortCircuitResponse,
) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }

    state.pipeline.spawn_response_phase(ResponseCompleteContext::buffered(
        ctx,
        adapter,
        response.status,
        response.body.clone(),
        ResponseSource::ShortCircuit { plugin },
    ));

    (status, headers, Body::from(response.body)).into_response()
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"))
}

fn return_headers(upstream: &HeaderMap) -> HeaderMap {
    upstream
        .iter()
        .filter(|(name, _)| should_return_header(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
