//! Development server serving manifests to mobile clients.

pub mod cli;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use devserve_manifest::data::load_or_create_host_id;
use devserve_manifest::{ProjectConfig, RuntimeState, ServerConfig};
use tokio::net::TcpListener;
use tracing::info;

use crate::cli::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    let config = app.server_config(ServerConfig::from_env());
    let project = ProjectConfig::load(&config.project_root)
        .with_context(|| format!("no usable project at {}", config.project_root.display()))?;

    let host_id = load_or_create_host_id(&config.state_dir())
        .with_context(|| format!("failed to persist host id under {}", config.state_dir().display()))?;
    let state = Arc::new(RuntimeState::new(host_id).with_offline(config.offline));
    if config.offline {
        info!("offline mode: manifests are served anonymously");
    }

    let middleware = Arc::new(server::build_middleware(&config, state));
    let addr = SocketAddr::new(app.host, app.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        project = %project.slug,
        protocol = ?config.protocol,
        mode = %config.mode,
        "serving manifests on http://{addr}"
    );
    axum::serve(listener, server::router(middleware)).await?;
    Ok(())
}
