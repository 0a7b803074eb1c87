//! Google Gemini `generateContent` API.

use serde_json::Value;

use super::{ProviderAdapter, ProviderKind, count};
use crate::domain::Usage;

#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiAdapter;

impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Llm
    }

    fn base_url(&self) -> &'static str {
        "https://generativelanguage.googleapis.com"
    }

    fn auth_header(&self) -> Option<&'static str> {
        Some("x-goog-api-key")
    }

    fn vendor_headers(&self) -> &'static [&'static str] {
        &["authorization", "x-goog-api-client", "x-goog-user-project"]
    }

    /// `/v1beta/models/gemini-2.0-flash:generateContent` → `gemini-2.0-flash`.
    fn model_from_path(&self, path: &str) -> Option<String> {
        let path = path.split('?').next().unwrap_or(path);
        let (_, rest) = path.split_once("/models/")?;
        let model = rest.split([':', '/']).next()?;
        (!model.is_empty()).then(|| model.to_string())
    }

    fn extract_usage(&self, body: Option<&Value>) -> Usage {
        let Some(usage) = body.and_then(|b| b.get("usageMetadata")) else {
            return Usage::default();
        };

        Usage {
            input_tokens: count(usage, "promptTokenCount"),
            output_tokens: count(usage, "candidatesTokenCount"),
            cache_creation_tokens: 0,
            cache_read_tokens: count(usage, "cachedContentTokenCount"),
        }
    }

    fn extract_stream_text(&self, event: &Value) -> Option<String> {
        let parts = event
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .as_array()?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
        (!text.is_empty()).then_some(text)
    }

    fn is_streaming_request(&self, _body: Option<&Value>, path: &str) -> bool {
        path.contains(":streamGenerateContent")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_from_path() {
        let adapter = GeminiAdapter;
        assert_eq!(
            adapter
                .model_from_path("/v1beta/models/gemini-1.5-pro:streamGenerateContent?alt=sse")
                .as_deref(),
            Some("gemini-1.5-pro")
        );
        assert_eq!(adapter.model_from_path("/v1beta/files"), None);
    }

    #[test]
    fn test_streaming_is_decided_by_method_suffix() {
        let adapter = GeminiAdapter;
        assert!(adapter.is_streaming_request(None, "/v1beta/models/x:streamGenerateContent"));
        assert!(!adapter.is_streaming_request(None, "/v1beta/models/x:generateContent"));
    }

    #[test]
    fn test_usage_and_text() {
        let event = json!({
            "candidates": [{"content": {"parts": [{"text": "Hel"}, {"text": "lo"}]}}],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "cachedContentTokenCount": 1}
        });
        let adapter = GeminiAdapter;
        assert_eq!(adapter.extract_stream_text(&event).as_deref(), Some("Hello"));
        let usage = adapter.extract_usage(Some(&event));
        assert_eq!((usage.input_tokens, usage.output_tokens, usage.cache_read_tokens), (4, 2, 1));
    }
}
