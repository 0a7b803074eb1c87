//! Anthropic Messages API.

use serde_json::Value;

use super::{ProviderAdapter, ProviderKind, count};
use crate::domain::Usage;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicAdapter;

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Llm
    }

    fn base_url(&self) -> &'static str {
        "https://api.anthropic.com"
    }

    fn auth_header(&self) -> Option<&'static str> {
        Some("x-api-key")
    }

    fn vendor_headers(&self) -> &'static [&'static str] {
        &[
            "authorization",
            "anthropic-version",
            "anthropic-beta",
            "anthropic-dangerous-direct-browser-access",
        ]
    }

    fn extract_usage(&self, body: Option<&Value>) -> Usage {
        // Buffered responses carry `usage` at the top level; the stream's
        // `message_start` event nests it under `message`.
        let Some(usage) = body.and_then(|b| {
            b.get("usage")
                .or_else(|| b.get("message").and_then(|m| m.get("usage")))
        }) else {
            return Usage::default();
        };

        Usage {
            input_tokens: count(usage, "input_tokens"),
            output_tokens: count(usage, "output_tokens"),
            cache_creation_tokens: count(usage, "cache_creation_input_tokens"),
            cache_read_tokens: count(usage, "cache_read_input_tokens"),
        }
    }

    fn extract_stream_text(&self, event: &Value) -> Option<String> {
        if event.get("type").and_then(Value::as_str) != Some("content_block_delta") {
            return None;
        }
        event
            .get("delta")
            .and_then(|d| d.get("text"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_from_buffered_response() {
        let body = json!({
            "type": "message",
            "usage": {
                "input_tokens": 25,
                "output_tokens": 120,
                "cache_creation_input_tokens": 5,
                "cache_read_input_tokens": 1000
            }
        });
        let usage = AnthropicAdapter.extract_usage(Some(&body));
        assert_eq!(usage.input_tokens, 25);
        assert_eq!(usage.output_tokens, 120);
        assert_eq!(usage.cache_creation_tokens, 5);
        assert_eq!(usage.cache_read_tokens, 1000);
    }

    #[test]
    fn test_usage_from_message_start_event() {
        let event = json!({
            "type": "message_start",
            "message": {"usage": {"input_tokens": 9, "output_tokens": 1}}
        });
        let usage = AnthropicAdapter.extract_usage(Some(&event));
        assert_eq!(usage.input_tokens, 9);
        assert_eq!(usage.output_tokens, 1);
    }

    #[test]
    fn test_stream_text_only_from_deltas() {
        let delta = json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "Hi"}});
        let ping = json!({"type": "ping"});
        assert_eq!(AnthropicAdapter.extract_stream_text(&delta).as_deref(), Some("Hi"));
        assert_eq!(AnthropicAdapter.extract_stream_text(&ping), None);
    }
}
