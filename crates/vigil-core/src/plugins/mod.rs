//! Built-in plugins.
//!
//! | Plugin      | Priority | Request                   | Response               |
//! |-------------|----------|---------------------------|------------------------|
//! | `dlp`       | 10       | scan, warn/redact/block   | scan, report only      |
//! | `optimizer` | 20       | trim prompt whitespace    |                        |
//! | `cache`     | 30       | answer from cache         | store 2xx responses    |
//! | `metrics`   | 90       |                           | request log row        |
//! | `audit`     | 100      |                           | audit row              |

mod audit;
mod cache;
mod dlp;
mod metrics;
mod optimizer;

use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheCipher, ResponseCache};
use crate::pipeline::PluginPipeline;
use crate::ports::{GatewayEventEmitter, Repos};
use crate::providers::ProviderRegistry;
use crate::settings::Settings;

pub use audit::AuditPlugin;
pub use cache::{CACHE_HEADER, CachePlugin};
pub use dlp::DlpPlugin;
pub use metrics::MetricsPlugin;
pub use optimizer::OptimizerPlugin;

pub const DLP_PRIORITY: i32 = 10;
pub const OPTIMIZER_PRIORITY: i32 = 20;
pub const CACHE_PRIORITY: i32 = 30;
pub const METRICS_PRIORITY: i32 = 90;
pub const AUDIT_PRIORITY: i32 = 100;

/// Register every built-in plugin that `settings` enables.
///
/// Metrics is always on.
pub fn register_builtin_plugins(
    pipeline: &mut PluginPipeline,
    settings: &Settings,
    repos: &Repos,
    cipher: Arc<CacheCipher>,
    registry: Arc<ProviderRegistry>,
    emitter: Arc<dyn GatewayEventEmitter>,
) {
    if settings.dlp.enabled {
        pipeline.register(Arc::new(DlpPlugin::new(
            &settings.dlp,
            Some(Arc::clone(&repos.audit)),
            Arc::clone(&emitter),
        )));
    }
    if settings.optimizer.enabled {
        pipeline.register(Arc::new(OptimizerPlugin::new(
            Arc::clone(&registry),
            Arc::clone(&emitter),
        )));
    }
    if settings.cache.enabled {
        let cache = ResponseCache::new(Arc::clone(&repos.cache), cipher);
        pipeline.register(Arc::new(CachePlugin::new(
            cache,
            registry,
            settings.cache.max_entries,
            Arc::clone(&emitter),
        )));
    }
    pipeline.register(Arc::new(MetricsPlugin::new(Arc::clone(&repos.request_log))));
    if settings.audit.enabled {
        pipeline.register(Arc::new(AuditPlugin::new(
            Arc::clone(&repos.audit),
            settings.audit.max_body_bytes,
        )));
    }

    info!(plugins = ?pipeline.plugin_names(), "Plugin pipeline ready");
}
