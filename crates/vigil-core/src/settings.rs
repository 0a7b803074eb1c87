//! Settings domain types and validation.
//!
//! Pure domain types with no infrastructure dependencies. Loading and
//! persistence go through the `SettingsRepository` port.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{DlpAction, PatternCategory};

/// Default port the gateway listens on.
pub const DEFAULT_PROXY_PORT: u16 = 8787;

/// Default per-plugin hook timeout.
pub const DEFAULT_PLUGIN_TIMEOUT_MS: u64 = 5_000;

/// Default grace period for in-flight plugin work at shutdown.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;

/// Policy for a request-phase plugin that errors or times out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    /// Skip the failing plugin and continue the chain.
    #[default]
    Open,
    /// Abort the chain and refuse the request.
    Closed,
}

/// What happens to a hook that is still running when its timeout fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Stop waiting; the hook keeps running on a tracked task and its
    /// result is discarded.
    #[default]
    Detach,
    /// Drop the hook future at the deadline.
    Cancel,
}

/// Detection engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DlpSettings {
    pub enabled: bool,
    pub action: DlpAction,
    pub categories: Vec<PatternCategory>,
    /// Minimum Shannon entropy (bits/char) for free-form secrets.
    pub entropy_threshold: f64,
    pub entropy_min_len: usize,
    pub entropy_max_len: usize,
    /// Also scan responses (detect and report only).
    pub scan_responses: bool,
}

impl Default for DlpSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            action: DlpAction::Warn,
            categories: PatternCategory::ALL.to_vec(),
            entropy_threshold: 3.5,
            entropy_min_len: 20,
            entropy_max_len: 128,
            scan_responses: true,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub enabled: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub enabled: bool,
    /// Bodies are truncated to this many bytes before being stored.
    pub max_body_bytes: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_body_bytes: 16 * 1024,
        }
    }
}

/// Gateway settings.
///
/// Scalar fields are optional to support partial updates and graceful
/// defaults; sections carry their own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Port the gateway listens on.
    pub proxy_port: Option<u16>,

    /// Request-phase plugin failure policy.
    pub fail_mode: Option<FailMode>,

    /// Per-plugin hook timeout in milliseconds.
    pub plugin_timeout_ms: Option<u64>,

    /// Behaviour of hooks that outlive their timeout.
    pub timeout_policy: Option<TimeoutPolicy>,

    /// How long shutdown waits for in-flight plugin work.
    pub shutdown_grace_ms: Option<u64>,

    /// Provider name → base URL, replacing the adapter's default upstream.
    pub upstream_overrides: BTreeMap<String, String>,

    pub dlp: DlpSettings,
    pub cache: CacheSettings,
    pub optimizer: OptimizerSettings,
    pub audit: AuditSettings,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            proxy_port: Some(DEFAULT_PROXY_PORT),
            fail_mode: Some(FailMode::Open),
            plugin_timeout_ms: Some(DEFAULT_PLUGIN_TIMEOUT_MS),
            timeout_policy: Some(TimeoutPolicy::Detach),
            shutdown_grace_ms: Some(DEFAULT_SHUTDOWN_GRACE_MS),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn effective_proxy_port(&self) -> u16 {
        self.proxy_port.unwrap_or(DEFAULT_PROXY_PORT)
    }

    #[must_use]
    pub fn effective_fail_mode(&self) -> FailMode {
        self.fail_mode.unwrap_or_default()
    }

    #[must_use]
    pub fn effective_plugin_timeout(&self) -> Duration {
        Duration::from_millis(self.plugin_timeout_ms.unwrap_or(DEFAULT_PLUGIN_TIMEOUT_MS))
    }

    #[must_use]
    pub fn effective_timeout_policy(&self) -> TimeoutPolicy {
        self.timeout_policy.unwrap_or_default()
    }

    #[must_use]
    pub fn effective_shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms.unwrap_or(DEFAULT_SHUTDOWN_GRACE_MS))
    }

    /// Merge an update into these settings, only touching fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(port) = other.proxy_port {
            self.proxy_port = port;
        }
        if let Some(mode) = other.fail_mode {
            self.fail_mode = mode;
        }
        if let Some(timeout) = other.plugin_timeout_ms {
            self.plugin_timeout_ms = timeout;
        }
        if let Some(policy) = other.timeout_policy {
            self.timeout_policy = policy;
        }
        if let Some(grace) = other.shutdown_grace_ms {
            self.shutdown_grace_ms = grace;
        }
        if let Some(ref overrides) = other.upstream_overrides {
            self.upstream_overrides.clone_from(overrides);
        }
        if let Some(ref dlp) = other.dlp {
            self.dlp.clone_from(dlp);
        }
        if let Some(ref cache) = other.cache {
            self.cache.clone_from(cache);
        }
        if let Some(ref optimizer) = other.optimizer {
            self.optimizer.clone_from(optimizer);
        }
        if let Some(ref audit) = other.audit {
            self.audit.clone_from(audit);
        }
    }
}

/// Partial settings update.
///
/// Scalar fields are `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset the field to its default
/// - `Some(Some(value))` = set field to value
///
/// Sections are replaced wholesale when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub proxy_port: Option<Option<u16>>,
    pub fail_mode: Option<Option<FailMode>>,
    pub plugin_timeout_ms: Option<Option<u64>>,
    pub timeout_policy: Option<Option<TimeoutPolicy>>,
    pub shutdown_grace_ms: Option<Option<u64>>,
    pub upstream_overrides: Option<BTreeMap<String, String>>,
    pub dlp: Option<DlpSettings>,
    pub cache: Option<CacheSettings>,
    pub optimizer: Option<OptimizerSettings>,
    pub audit: Option<AuditSettings>,
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("Plugin timeout must be between 1 and 60000 ms, got {0}")]
    InvalidPluginTimeout(u64),

    #[error("Entropy threshold must be between 0 and 8 bits/char, got {0}")]
    InvalidEntropyThreshold(f64),

    #[error("Entropy length range is empty: min {min}, max {max}")]
    InvalidEntropyRange { min: usize, max: usize },

    #[error("Cache must keep at least one entry")]
    InvalidCacheSize,

    #[error("Upstream override for {provider} is not an http(s) URL: {url}")]
    InvalidUpstream { provider: String, url: String },
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(port) = settings.proxy_port {
        if port < 1024 {
            return Err(SettingsError::InvalidPort(port));
        }
    }

    if let Some(timeout) = settings.plugin_timeout_ms {
        if !(1..=60_000).contains(&timeout) {
            return Err(SettingsError::InvalidPluginTimeout(timeout));
        }
    }

    let dlp = &settings.dlp;
    if !(0.0..=8.0).contains(&dlp.entropy_threshold) {
        return Err(SettingsError::InvalidEntropyThreshold(dlp.entropy_threshold));
    }
    if dlp.entropy_min_len == 0 || dlp.entropy_min_len > dlp.entropy_max_len {
        return Err(SettingsError::InvalidEntropyRange {
            min: dlp.entropy_min_len,
            max: dlp.entropy_max_len,
        });
    }

    if settings.cache.enabled && settings.cache.max_entries == 0 {
        return Err(SettingsError::InvalidCacheSize);
    }

    for (provider, url) in &settings.upstream_overrides {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SettingsError::InvalidUpstream {
                provider: provider.clone(),
                url: url.clone(),
            });
        }
    }

    Ok(())
}
