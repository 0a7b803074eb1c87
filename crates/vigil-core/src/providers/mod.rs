//! Provider adapters and routing.
//!
//! One adapter per upstream API family. Adapters are stateless: they know
//! the upstream base URL, which request headers may be forwarded, and how
//! to read the model name and token usage out of that vendor's JSON.
//!
//! The set is fixed at startup; [`ProviderRegistry`] maps URL path prefixes
//! onto adapters with longest-prefix matching.

mod anthropic;
mod claude_web;
mod gemini;
mod messaging;
mod openai;
mod registry;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{UNKNOWN_MODEL, Usage};

pub use anthropic::AnthropicAdapter;
pub use claude_web::ClaudeWebAdapter;
pub use gemini::GeminiAdapter;
pub use messaging::MessagingAdapter;
pub use openai::OpenAiAdapter;
pub use registry::{ProviderRegistry, ProviderRoute, RouteError, RouteFilter, RouteMatch};

/// Headers every adapter forwards.
const COMMON_HEADERS: &[&str] = &["content-type", "accept"];

/// Adapter class. Cache and prompt optimization only apply to `Llm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Llm,
    Messaging,
}

/// Vendor-specific behaviour for one upstream API family.
pub trait ProviderAdapter: Send + Sync + fmt::Debug {
    /// Stable provider name (`anthropic`, `openai`, `telegram`, …).
    fn name(&self) -> &'static str;

    fn kind(&self) -> ProviderKind;

    /// Default upstream base URL, without a trailing slash.
    fn base_url(&self) -> &'static str;

    /// Header carrying the credential, if the vendor uses one.
    fn auth_header(&self) -> Option<&'static str>;

    /// Vendor-specific headers forwarded in addition to the auth header.
    fn vendor_headers(&self) -> &'static [&'static str] {
        &[]
    }

    /// Allow-list projection of inbound headers onto what upstream accepts.
    ///
    /// Anything not recognised is dropped so gateway-internal headers never
    /// leave the machine. Expects lowercased names.
    fn transform_headers(&self, headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        headers
            .iter()
            .filter(|(name, _)| self.forwards_header(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Whether `name` (lowercase) is on this adapter's allow-list.
    fn forwards_header(&self, name: &str) -> bool {
        COMMON_HEADERS.contains(&name)
            || self.auth_header() == Some(name)
            || self.vendor_headers().contains(&name)
    }

    /// Canonical model name from a request body, `"unknown"` when absent.
    fn extract_model(&self, body: Option<&Value>) -> String {
        body.and_then(|b| b.get("model"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map_or_else(|| UNKNOWN_MODEL.to_string(), ToString::to_string)
    }

    /// Model name carried in the URL path, for vendors that put it there.
    fn model_from_path(&self, _path: &str) -> Option<String> {
        None
    }

    /// Normalized usage from a response body or stream event. Never fails.
    fn extract_usage(&self, _body: Option<&Value>) -> Usage {
        Usage::default()
    }

    /// Text delta carried by one stream event, if any.
    fn extract_stream_text(&self, _event: &Value) -> Option<String> {
        None
    }

    /// Whether the request asks for an event-stream response.
    fn is_streaming_request(&self, body: Option<&Value>, _path: &str) -> bool {
        body.and_then(|b| b.get("stream"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Read a token count, tolerating absent or non-numeric fields.
fn count(value: &Value, field: &str) -> u64 {
    value.get(field).and_then(Value::as_u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_transform_headers_is_allow_list() {
        let inbound = headers(&[
            ("x-api-key", "secret"),
            ("anthropic-version", "2023-06-01"),
            ("content-type", "application/json"),
            ("x-vigil-internal", "1"),
            ("cookie", "session=abc"),
            ("host", "localhost:8787"),
        ]);
        let out = AnthropicAdapter.transform_headers(&inbound);
        assert_eq!(out.len(), 3);
        assert!(out.contains_key("x-api-key"));
        assert!(out.contains_key("anthropic-version"));
        assert!(out.contains_key("content-type"));
        assert!(!out.contains_key("x-vigil-internal"));
        assert!(!out.contains_key("cookie"));
    }

    #[test]
    fn test_extract_model_defaults_to_unknown() {
        assert_eq!(OpenAiAdapter.extract_model(None), UNKNOWN_MODEL);
        let body = serde_json::json!({"model": ""});
        assert_eq!(OpenAiAdapter.extract_model(Some(&body)), UNKNOWN_MODEL);
        let body = serde_json::json!({"model": "gpt-4o"});
        assert_eq!(OpenAiAdapter.extract_model(Some(&body)), "gpt-4o");
    }

    #[test]
    fn test_usage_absent_is_zero() {
        let body = serde_json::json!({"id": "x"});
        assert!(AnthropicAdapter.extract_usage(Some(&body)).is_empty());
        assert!(GeminiAdapter.extract_usage(None).is_empty());
        assert!(MessagingAdapter::telegram().extract_usage(Some(&body)).is_empty());
    }
}
