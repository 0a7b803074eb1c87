//! Repository implementations using `SQLite`.
//!
//! These implementations encapsulate all SQL queries and database access.
//! The `SqlitePool` is confined to this module and never exposed through
//! the port trait signatures.

mod row_mappers;
mod sqlite_audit_repository;
mod sqlite_cache_store;
mod sqlite_request_log_repository;
mod sqlite_settings_repository;

pub use sqlite_audit_repository::SqliteAuditRepository;
pub use sqlite_cache_store::SqliteCacheStore;
pub use sqlite_request_log_repository::SqliteRequestLogRepository;
pub use sqlite_settings_repository::{SETTINGS_SCHEMA_VERSION, SqliteSettingsRepository};
