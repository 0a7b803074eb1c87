//! OpenAI Chat Completions / Responses API.

use serde_json::Value;

use super::{ProviderAdapter, ProviderKind, count};
use crate::domain::Usage;

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiAdapter;

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Llm
    }

    fn base_url(&self) -> &'static str {
        "https://api.openai.com"
    }

    fn auth_header(&self) -> Option<&'static str> {
        Some("authorization")
    }

    fn vendor_headers(&self) -> &'static [&'static str] {
        &["openai-organization", "openai-project", "openai-beta"]
    }

    fn extract_usage(&self, body: Option<&Value>) -> Usage {
        // Responses API stream events nest the final object under `response`.
        let Some(usage) = body.and_then(|b| {
            b.get("usage")
                .filter(|u| u.is_object())
                .or_else(|| b.get("response").and_then(|r| r.get("usage")))
        }) else {
            return Usage::default();
        };

        // Chat Completions says prompt/completion, Responses says input/output.
        let input = count(usage, "prompt_tokens").max(count(usage, "input_tokens"));
        let output = count(usage, "completion_tokens").max(count(usage, "output_tokens"));
        let cached = usage
            .get("prompt_tokens_details")
            .or_else(|| usage.get("input_tokens_details"))
            .map_or(0, |d| count(d, "cached_tokens"));

        Usage {
            input_tokens: input,
            output_tokens: output,
            cache_creation_tokens: 0,
            cache_read_tokens: cached,
        }
    }

    fn extract_stream_text(&self, event: &Value) -> Option<String> {
        if let Some(content) = event
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
        {
            return Some(content.to_string());
        }

        if event.get("type").and_then(Value::as_str) == Some("response.output_text.delta") {
            return event
                .get("delta")
                .and_then(Value::as_str)
                .map(ToString::to_string);
        }

        None
    }
}
