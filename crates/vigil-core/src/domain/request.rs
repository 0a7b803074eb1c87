//! Per-request context threaded through the plugin pipeline.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::providers::{ProviderAdapter, ProviderKind};

/// Model name used when a request body does not name one.
pub const UNKNOWN_MODEL: &str = "unknown";

/// Normalized token usage for a single exchange.
///
/// Every provider reports usage under different field names; adapters map
/// them onto this shape. Missing fields are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
}

impl Usage {
    /// Fold a later usage report into this one.
    ///
    /// Streaming providers report cumulative counts spread over several
    /// events (input on the first, output on the last), so each field keeps
    /// the largest value seen.
    pub fn merge(&mut self, other: &Self) {
        self.input_tokens = self.input_tokens.max(other.input_tokens);
        self.output_tokens = self.output_tokens.max(other.output_tokens);
        self.cache_creation_tokens = self.cache_creation_tokens.max(other.cache_creation_tokens);
        self.cache_read_tokens = self.cache_read_tokens.max(other.cache_read_tokens);
    }

    pub const fn is_empty(&self) -> bool {
        self.input_tokens == 0
            && self.output_tokens == 0
            && self.cache_creation_tokens == 0
            && self.cache_read_tokens == 0
    }

    pub const fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Everything the pipeline knows about an inbound request.
///
/// Plugins receive it by shared reference. The only way to change it is to
/// return `PluginOutcome::ModifiedBody`, which the pipeline applies through
/// [`RequestContext::apply_modified_body`] before the next plugin runs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: Uuid,
    pub provider: String,
    pub provider_kind: ProviderKind,
    pub model: String,
    pub method: String,
    pub path: String,
    /// Lowercased header names.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    /// `None` when the body is empty or not JSON.
    pub parsed_body: Option<Arc<Value>>,
    pub streaming: bool,
    pub received_at: DateTime<Utc>,
    pub started: Instant,
}

impl RequestContext {
    /// Build the context for a request routed to `adapter`.
    pub fn new(
        adapter: &dyn ProviderAdapter,
        method: impl Into<String>,
        path: impl Into<String>,
        headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> Self {
        let path = path.into();
        let parsed_body = parse_body(&body);
        let parsed = parsed_body.as_deref();

        let mut model = adapter.extract_model(parsed);
        if model == UNKNOWN_MODEL
            && let Some(from_path) = adapter.model_from_path(&path)
        {
            model = from_path;
        }

        Self {
            id: Uuid::new_v4(),
            provider: adapter.name().to_string(),
            provider_kind: adapter.kind(),
            streaming: adapter.is_streaming_request(parsed, &path),
            model,
            method: method.into(),
            path,
            headers,
            body,
            parsed_body,
            received_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Replace the body and re-parse it so later plugins see the new content.
    pub fn apply_modified_body(&mut self, body: String) {
        self.body = Bytes::from(body);
        self.parsed_body = parse_body(&self.body);
    }

    /// Body as text, lossily decoded.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

fn parse_body(body: &[u8]) -> Option<Arc<Value>> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<Value>(body).ok().map(Arc::new)
}

/// Where the response delivered to the client came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseSource {
    /// The upstream provider answered.
    Upstream,
    /// A request-phase plugin answered without contacting upstream.
    ShortCircuit { plugin: String },
}

/// Context handed to response-phase hooks once the exchange has finished.
#[derive(Debug, Clone)]
pub struct ResponseCompleteContext {
    /// The request as it was sent upstream (after any body modifications).
    pub request: RequestContext,
    pub status: u16,
    /// Full body for buffered responses. Empty for streamed responses.
    pub body: Bytes,
    pub parsed_body: Option<Arc<Value>>,
    /// Concatenated text deltas for streamed responses.
    pub stream_text: Option<String>,
    pub usage: Usage,
    pub latency: Duration,
    pub streaming: bool,
    pub source: ResponseSource,
}

impl ResponseCompleteContext {
    /// Context for a buffered (non-streaming) response.
    pub fn buffered(
        request: RequestContext,
        adapter: &dyn ProviderAdapter,
        status: u16,
        body: Bytes,
        source: ResponseSource,
    ) -> Self {
        let parsed_body = parse_body(&body);
        let usage = adapter.extract_usage(parsed_body.as_deref());
        let latency = request.elapsed();
        Self {
            request,
            status,
            body,
            parsed_body,
            stream_text: None,
            usage,
            latency,
            streaming: false,
            source,
        }
    }

    /// Context for a streamed response, built from the tap's summary.
    pub fn streamed(request: RequestContext, status: u16, usage: Usage, text: String) -> Self {
        let latency = request.elapsed();
        Self {
            request,
            status,
            body: Bytes::new(),
            parsed_body: None,
            stream_text: Some(text),
            usage,
            latency,
            streaming: true,
            source: ResponseSource::Upstream,
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Response text: the buffered body, or the accumulated stream text.
    pub fn text(&self) -> Cow<'_, str> {
        match &self.stream_text {
            Some(text) => Cow::Borrowed(text.as_str()),
            None => String::from_utf8_lossy(&self.body),
        }
    }
}
