#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod cache;
pub mod dlp;
pub mod domain;
pub mod events;
pub mod optimizer;
pub mod paths;
pub mod pipeline;
pub mod plugins;
pub mod ports;
pub mod providers;
pub mod settings;
pub mod stream;

// Re-export commonly used types for convenience
pub use cache::{CacheCipher, CacheError, ResponseCache, cache_key};
pub use dlp::{DetectionEngine, DlpConfig, EntropyGate};
pub use domain::{
    AuditRecord, CacheEntry, CacheStats, CachedResponse, DetectionFinding, DetectionRecord,
    DetectionResult, Direction, DlpAction, FindingSummary, PatternCategory, RequestContext,
    RequestLogRecord, RequestLogSummary, ResponseCompleteContext, ResponseSource, Usage,
};
pub use events::GatewayEvent;
pub use pipeline::{
    HookPhase, PipelineConfig, Plugin, PluginError, PluginFault, PluginOutcome, PluginPipeline,
    RequestPhaseOutcome, ShortCircuitResponse,
};
pub use ports::{
    AuditRepository, CacheStore, CollectingEmitter, CoreError, GatewayEventEmitter, NoopEmitter,
    Repos, RepositoryError, RequestLogRepository, SettingsRepository,
};
pub use providers::{
    ProviderAdapter, ProviderKind, ProviderRegistry, RouteError, RouteFilter, RouteMatch,
};
pub use settings::{
    AuditSettings, CacheSettings, DEFAULT_PROXY_PORT, DlpSettings, FailMode, OptimizerSettings,
    Settings, SettingsError, SettingsUpdate, TimeoutPolicy, validate_settings,
};
pub use stream::{SseParser, StreamAccumulator, StreamEvent, StreamSummary};

// Re-export path utilities
pub use paths::{PathError, cache_key_path, data_root, database_path};
