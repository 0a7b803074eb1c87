//! Gateway entry point - the composition root.
//!
//! Parses arguments, installs logging, bootstraps storage and the plugin
//! pipeline through `vigil_proxy::bootstrap`, then serves until Ctrl-C.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vigil_core::{FailMode, SettingsUpdate};
use vigil_proxy::{ServerConfig, bootstrap, serve};

const DEFAULT_LOG_FILTER: &str = "vigil=info,vigil_core=info,vigil_proxy=info,tower_http=warn";

/// Local inspecting gateway for LLM and messaging provider APIs.
#[derive(Debug, Parser)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Local-first inspecting gateway for LLM and messaging provider APIs")]
struct Cli {
    /// Port to listen on (overrides the stored setting)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: std::net::IpAddr,

    /// Data directory for the database and cache key
    #[arg(long = "data-dir", env = "VIGIL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Refuse requests when a plugin fails instead of skipping it
    #[arg(long)]
    fail_closed: bool,
}

impl Cli {
    fn overrides(&self) -> SettingsUpdate {
        SettingsUpdate {
            proxy_port: self.port.map(Some),
            fail_mode: self.fail_closed.then_some(Some(FailMode::Closed)),
            ..SettingsUpdate::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig {
        overrides: cli.overrides(),
        data_dir: cli.data_dir.clone(),
    };

    let ctx = bootstrap(config).await?;
    let addr = SocketAddr::new(cli.bind, ctx.settings.effective_proxy_port());
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        fail_mode = ?ctx.settings.effective_fail_mode(),
        plugins = ?ctx.pipeline.plugin_names(),
        "Gateway ready"
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
            cancel.cancel();
        }
    });

    serve(listener, Arc::new(ctx), cancel).await
}
