//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` types in any signature
//! - Traits are minimal and CRUD-focused for repositories
//! - Storage implementations serialize their own writes

pub mod audit_log;
pub mod cache_store;
pub mod event_emitter;
pub mod request_log;
pub mod settings_repository;

use std::sync::Arc;
use thiserror::Error;

pub use audit_log::AuditRepository;
pub use cache_store::CacheStore;
pub use event_emitter::{CollectingEmitter, GatewayEventEmitter, NoopEmitter};
pub use request_log::RequestLogRepository;
pub use settings_repository::SettingsRepository;

/// Container for all repository trait objects.
///
/// Built once by the storage adapter and owned by the gateway instance, so
/// several isolated gateways can run side by side (e.g. in tests).
#[derive(Clone)]
pub struct Repos {
    /// Encrypted response cache storage.
    pub cache: Arc<dyn CacheStore>,
    /// Per-request metrics log.
    pub request_log: Arc<dyn RequestLogRepository>,
    /// Exchange and detection audit log.
    pub audit: Arc<dyn AuditRepository>,
    /// Persisted gateway settings.
    pub settings: Arc<dyn SettingsRepository>,
}

impl Repos {
    /// Create a new Repos container.
    pub fn new(
        cache: Arc<dyn CacheStore>,
        request_log: Arc<dyn RequestLogRepository>,
        audit: Arc<dyn AuditRepository>,
        settings: Arc<dyn SettingsRepository>,
    ) -> Self {
        Self {
            cache,
            request_log,
            audit,
            settings,
        }
    }
}

/// Domain-specific errors for repository operations.
///
/// This error type abstracts away storage implementation details (e.g., sqlx errors)
/// and provides a clean interface for services to handle storage failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage backend error (database, filesystem, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A constraint was violated (e.g., unique constraint).
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Core error type for semantic domain errors.
///
/// Adapters map this to their own error types (HTTP status codes,
/// process exit codes).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Settings validation error.
    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),

    /// Cache cipher or key failure.
    #[error(transparent)]
    Cache(#[from] crate::cache::CacheError),

    /// Route registration failed.
    #[error(transparent)]
    Route(#[from] crate::providers::RouteError),

    /// Path resolution failed.
    #[error(transparent)]
    Path(#[from] crate::paths::PathError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}
