//! Canonical gateway event catalog.
//!
//! Every observable thing the request path does is one variant here, so
//! listeners (the SSE endpoint, tests) can match exhaustively instead of
//! subscribing to free-form string topics.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "cache_hit", "requestId": "…", "provider": "anthropic", "model": "claude-sonnet-4" }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Direction, DlpAction, Usage};
use crate::pipeline::HookPhase;
use crate::settings::FailMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// A request matched a provider route.
    RequestRouted {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        provider: String,
        model: String,
        path: String,
    },

    /// A plugin hook failed or timed out.
    PluginFault {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        plugin: String,
        phase: HookPhase,
        error: String,
        /// Mode in force when the fault happened; `closed` means the request was refused.
        #[serde(rename = "failMode")]
        fail_mode: FailMode,
    },

    /// A request-phase plugin refused the request.
    RequestBlocked {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        plugin: String,
        reason: String,
    },

    /// A request-phase plugin answered without contacting upstream.
    ShortCircuited {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        plugin: String,
        status: u16,
    },

    CacheHit {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        provider: String,
        model: String,
    },

    CacheStored {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        provider: String,
        model: String,
        /// Entries removed by the eviction that followed the store.
        evicted: u64,
    },

    DlpDetected {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        direction: Direction,
        action: DlpAction,
        patterns: Vec<String>,
        #[serde(rename = "matchCount")]
        match_count: usize,
    },

    PromptOptimized {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        #[serde(rename = "savedChars")]
        saved_chars: usize,
    },

    ResponseCompleted {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        provider: String,
        model: String,
        status: u16,
        #[serde(rename = "latencyMs")]
        latency_ms: u64,
        usage: Usage,
        streaming: bool,
    },
}

impl GatewayEvent {
    /// The request this event belongs to.
    pub const fn request_id(&self) -> Uuid {
        match self {
            Self::RequestRouted { request_id, .. }
            | Self::PluginFault { request_id, .. }
            | Self::RequestBlocked { request_id, .. }
            | Self::ShortCircuited { request_id, .. }
            | Self::CacheHit { request_id, .. }
            | Self::CacheStored { request_id, .. }
            | Self::DlpDetected { request_id, .. }
            | Self::PromptOptimized { request_id, .. }
            | Self::ResponseCompleted { request_id, .. } => *request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format_is_tagged() {
        let event = GatewayEvent::CacheHit {
            request_id: Uuid::nil(),
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "cache_hit");
        assert_eq!(json["provider"], "openai");
        assert!(json.get("requestId").is_some());
    }

    #[test]
    fn test_plugin_fault_round_trips() {
        let event = GatewayEvent::PluginFault {
            request_id: Uuid::nil(),
            plugin: "dlp".to_string(),
            phase: HookPhase::Request,
            error: "boom".to_string(),
            fail_mode: FailMode::Closed,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: GatewayEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.request_id(), Uuid::nil());
    }
}
