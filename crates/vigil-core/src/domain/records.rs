//! Records written by the metrics and audit plugins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Direction, DlpAction, PatternCategory, Usage};

/// One row of the request log, written after every exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLogRecord {
    pub request_id: Uuid,
    pub provider: String,
    pub model: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub streaming: bool,
    /// Answered by a request-phase plugin (e.g. a cache hit).
    pub short_circuited: bool,
    pub latency_ms: u64,
    pub usage: Usage,
    pub created_at: DateTime<Utc>,
}

/// Totals over the request log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogSummary {
    pub total_requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub short_circuited: u64,
}

/// Recorded request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub request_id: Uuid,
    pub provider: String,
    pub model: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    /// Request body, truncated to the configured limit.
    pub request_body: String,
    /// Response body (or accumulated stream text), truncated.
    pub response_body: String,
    pub created_at: DateTime<Utc>,
}

/// Per-pattern summary persisted with a detection. Matched values are not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingSummary {
    pub pattern: String,
    pub category: PatternCategory,
    pub match_count: usize,
}

/// A detection event, as written to the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub request_id: Uuid,
    pub provider: String,
    pub direction: Direction,
    pub action: DlpAction,
    pub findings: Vec<FindingSummary>,
    pub created_at: DateTime<Utc>,
}
