//! Core domain types.
//!
//! These are pure data types shared by the pipeline, the plugins, and the
//! adapters. They carry no infrastructure detail: headers are plain string
//! maps and bodies are `Bytes`, so neither `http` nor `sqlx` types leak
//! into the core.

mod cache;
mod detection;
mod records;
mod request;

pub use cache::{CacheEntry, CacheStats, CachedResponse};
pub use detection::{DetectionFinding, DetectionResult, Direction, DlpAction, PatternCategory};
pub use records::{AuditRecord, DetectionRecord, FindingSummary, RequestLogRecord, RequestLogSummary};
pub use request::{RequestContext, ResponseCompleteContext, ResponseSource, UNKNOWN_MODEL, Usage};
