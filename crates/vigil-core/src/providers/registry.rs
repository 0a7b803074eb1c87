//! Path-prefix routing onto provider adapters.
//!
//! Routes are kept in a flat list and resolved with a linear scan that
//! keeps the longest matching prefix. When two prefixes of the same length
//! both match, whichever was registered first wins.

use std::sync::Arc;

use thiserror::Error;

use super::{
    AnthropicAdapter, ClaudeWebAdapter, GeminiAdapter, MessagingAdapter, OpenAiAdapter,
    ProviderAdapter, ProviderKind,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("Route prefix must start with '/': {0}")]
    InvalidPrefix(String),

    #[error("Route prefix already registered: {0}")]
    DuplicatePrefix(String),
}

/// Restricts which adapters may match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RouteFilter {
    #[default]
    All,
    /// Only LLM adapters; messaging routes are ignored.
    LlmOnly,
}

/// One registered prefix.
#[derive(Debug, Clone)]
pub struct ProviderRoute {
    pub prefix: String,
    pub adapter: Arc<dyn ProviderAdapter>,
    /// Remove the prefix when building the upstream path (`/openai/v1/x` → `/v1/x`).
    pub strip_prefix: bool,
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub adapter: Arc<dyn ProviderAdapter>,
    pub matched_prefix: String,
    /// Path (and query) to request upstream.
    pub upstream_path: String,
}

/// Registry of provider adapters keyed by path prefix.
///
/// Populated once at startup and read-only afterwards; share it behind an
/// `Arc`.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    routes: Vec<ProviderRoute>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in routes for every supported provider.
    ///
    /// Each provider gets a namespaced prefix (`/anthropic`, `/openai`, …)
    /// that is stripped before forwarding. The LLM vendors additionally get
    /// their native API paths so clients can point their base URL straight
    /// at the gateway.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        let anthropic: Arc<dyn ProviderAdapter> = Arc::new(AnthropicAdapter);
        let openai: Arc<dyn ProviderAdapter> = Arc::new(OpenAiAdapter);
        let gemini: Arc<dyn ProviderAdapter> = Arc::new(GeminiAdapter);
        let claude_web: Arc<dyn ProviderAdapter> = Arc::new(ClaudeWebAdapter);

        let mut defaults: Vec<(&str, &Arc<dyn ProviderAdapter>, bool)> = vec![
            ("/anthropic", &anthropic, true),
            ("/v1/messages", &anthropic, false),
            ("/openai", &openai, true),
            ("/v1/chat/completions", &openai, false),
            ("/v1/responses", &openai, false),
            ("/v1/embeddings", &openai, false),
            ("/gemini", &gemini, true),
            ("/v1beta/models", &gemini, false),
            ("/claude-web", &claude_web, true),
        ];

        let messaging: Vec<(String, Arc<dyn ProviderAdapter>)> = MessagingAdapter::all()
            .into_iter()
            .map(|m| (format!("/{}", m.name()), Arc::new(m) as Arc<dyn ProviderAdapter>))
            .collect();
        for (prefix, adapter) in &messaging {
            defaults.push((prefix.as_str(), adapter, true));
        }

        for (prefix, adapter, strip) in defaults {
            // The table above has unique, '/'-prefixed entries.
            let _ = registry.register(prefix, Arc::clone(adapter), strip);
        }
        registry
    }

    /// Register `adapter` under `prefix`.
    pub fn register(
        &mut self,
        prefix: &str,
        adapter: Arc<dyn ProviderAdapter>,
        strip_prefix: bool,
    ) -> Result<(), RouteError> {
        if !prefix.starts_with('/') {
            return Err(RouteError::InvalidPrefix(prefix.to_string()));
        }
        let prefix = normalize_prefix(prefix);
        if self.routes.iter().any(|r| r.prefix == prefix) {
            return Err(RouteError::DuplicatePrefix(prefix));
        }
        self.routes.push(ProviderRoute {
            prefix,
            adapter,
            strip_prefix,
        });
        Ok(())
    }

    /// Resolve `path` (which may carry a query string) to an adapter.
    ///
    /// A prefix matches when the path equals it or continues with `/`, so
    /// `/openai` never captures `/openai-proxy`. The longest match wins.
    pub fn resolve_route(&self, path: &str, filter: RouteFilter) -> Option<RouteMatch> {
        let (path_only, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };

        let route = self
            .routes
            .iter()
            .filter(|r| filter != RouteFilter::LlmOnly || r.adapter.kind() == ProviderKind::Llm)
            .filter(|r| prefix_matches(&r.prefix, path_only))
            .fold(None::<&ProviderRoute>, |best, r| match best {
                Some(b) if b.prefix.len() >= r.prefix.len() => Some(b),
                _ => Some(r),
            })?;

        let mut upstream_path = if route.strip_prefix {
            let rest = &path_only[route.prefix.len()..];
            if rest.is_empty() { "/".to_string() } else { rest.to_string() }
        } else {
            path_only.to_string()
        };
        if let Some(query) = query {
            upstream_path.push('?');
            upstream_path.push_str(query);
        }

        Some(RouteMatch {
            adapter: Arc::clone(&route.adapter),
            matched_prefix: route.prefix.clone(),
            upstream_path,
        })
    }

    /// Look up an adapter by provider name.
    pub fn adapter(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.routes
            .iter()
            .find(|r| r.adapter.name() == name)
            .map(|r| Arc::clone(&r.adapter))
    }

    pub fn routes(&self) -> &[ProviderRoute] {
        &self.routes
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path.starts_with('/');
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
