//! claude.ai web client traffic.
//!
//! The web app authenticates with a session cookie and streams completion
//! events without usage counts, so usage is always zero here.

use serde_json::Value;

use super::{ProviderAdapter, ProviderKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeWebAdapter;

impl ProviderAdapter for ClaudeWebAdapter {
    fn name(&self) -> &'static str {
        "claude-web"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Llm
    }

    fn base_url(&self) -> &'static str {
        "https://claude.ai"
    }

    fn auth_header(&self) -> Option<&'static str> {
        Some("cookie")
    }

    fn vendor_headers(&self) -> &'static [&'static str] {
        &[
            "user-agent",
            "origin",
            "referer",
            "anthropic-client-platform",
            "anthropic-client-sha",
            "anthropic-client-version",
            "anthropic-device-id",
            "anthropic-anonymous-id",
        ]
    }

    fn extract_stream_text(&self, event: &Value) -> Option<String> {
        // Older web builds emit `{"completion": "..."}`, newer ones mirror the
        // Messages API `content_block_delta` shape.
        if let Some(text) = event.get("completion").and_then(Value::as_str) {
            return Some(text.to_string());
        }
        event
            .get("delta")
            .and_then(|d| d.get("text"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
    }

    fn is_streaming_request(&self, body: Option<&Value>, path: &str) -> bool {
        path.ends_with("/completion")
            || body
                .and_then(|b| b.get("stream"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }
}
