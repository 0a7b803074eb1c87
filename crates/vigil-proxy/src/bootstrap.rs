//! Gateway bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together:
//! the SQLite repositories, the cache key, the provider registry, the
//! plugin pipeline and the event broadcaster all meet here and end up as
//! fields of one [`GatewayContext`]. Nothing is process-global, so tests
//! can run several gateways side by side.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;
use vigil_core::paths::{cache_key_path_in, data_root, database_path_in, ensure_directory};
use vigil_core::plugins::register_builtin_plugins;
use vigil_core::{
    CacheCipher, GatewayEventEmitter, PipelineConfig, Plugin, PluginPipeline, ProviderRegistry,
    Repos, ResponseCache, Settings, SettingsUpdate, validate_settings,
};
use vigil_db::{CoreFactory, setup_database};

use crate::sse::EventBroadcaster;

const UPSTREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Startup configuration supplied by the binary.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Data directory. `None` resolves the platform default.
    pub data_dir: Option<PathBuf>,
    /// Overrides applied on top of the stored settings for this run only.
    pub overrides: SettingsUpdate,
}

/// Everything a request handler needs.
pub struct GatewayContext {
    pub settings: Settings,
    pub registry: Arc<ProviderRegistry>,
    pub pipeline: Arc<PluginPipeline>,
    pub repos: Repos,
    pub cache: ResponseCache,
    pub events: Arc<EventBroadcaster>,
    /// Client for upstream requests.
    pub client: Client,
}

impl GatewayContext {
    /// Base URL for `provider`: the configured override, or the adapter default.
    pub fn upstream_base<'a>(&'a self, provider: &str, default: &'a str) -> &'a str {
        self.settings
            .upstream_overrides
            .get(provider)
            .map_or(default, String::as_str)
    }
}

/// Wire a gateway from already-built repositories and cipher.
///
/// `extra_plugins` are registered after the built-ins; their priorities
/// decide where they actually run.
pub fn assemble(
    settings: Settings,
    repos: Repos,
    cipher: Arc<CacheCipher>,
    extra_plugins: Vec<Arc<dyn Plugin>>,
) -> Result<GatewayContext> {
    let registry = Arc::new(ProviderRegistry::with_defaults());
    let events = Arc::new(EventBroadcaster::with_defaults());
    let emitter: Arc<dyn GatewayEventEmitter> = events.clone();

    let mut pipeline = PluginPipeline::new(PipelineConfig::from(&settings), Arc::clone(&emitter));
    register_builtin_plugins(
        &mut pipeline,
        &settings,
        &repos,
        Arc::clone(&cipher),
        Arc::clone(&registry),
        emitter,
    );
    for plugin in extra_plugins {
        pipeline.register(plugin);
    }

    // Clients often reach the gateway through HTTP(S)_PROXY; inheriting it would loop.
    let client = Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(10)
        .connect_timeout(UPSTREAM_CONNECT_TIMEOUT)
        .build()
        .context("Failed to build upstream HTTP client")?;

    Ok(GatewayContext {
        cache: ResponseCache::new(Arc::clone(&repos.cache), cipher),
        settings,
        registry,
        pipeline: Arc::new(pipeline),
        repos,
        events,
        client,
    })
}

/// Open storage under the data directory, load settings and wire the gateway.
pub async fn bootstrap(config: ServerConfig) -> Result<GatewayContext> {
    let root = match config.data_dir {
        Some(dir) => dir,
        None => data_root()?,
    };
    ensure_directory(&root)?;

    let db_path = database_path_in(&root)?;
    let key_path = cache_key_path_in(&root)?;
    info!(
        target: "vigil.paths",
        data_root = %root.display(),
        database_path = %db_path.display(),
        cache_key_path = %key_path.display(),
        "Gateway bootstrap resolved paths"
    );

    let pool = setup_database(&db_path).await?;
    let repos = CoreFactory::build_repos(pool);

    let mut settings = repos.settings.load().await?;
    settings.merge(&config.overrides);
    validate_settings(&settings)?;

    let cipher = Arc::new(CacheCipher::load_or_create(&key_path)?);

    assemble(settings, repos, cipher, Vec::new())
}
