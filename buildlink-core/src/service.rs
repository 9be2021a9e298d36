//! Composition root: config -> registry -> initial refresh -> scheduler -> HTTP

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::api;
use crate::catalog::{LoadReport, Registry};
use crate::config::ServiceConfig;
use crate::scheduler::Scheduler;
use crate::upstream::JenkinsConnector;

/// Connector for the configured upstream settings
pub fn connector(config: &ServiceConfig) -> JenkinsConnector {
    JenkinsConnector {
        timeout: config.upstream_timeout(),
        user_agent: config.upstream.user_agent.clone(),
    }
}

/// Create the projects directory if it is missing
pub fn ensure_projects_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        info!("Creating projects directory {}", dir.display());
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create projects directory {}", dir.display()))?;
    }
    Ok(())
}

/// Load every project schema; nothing is fetched yet
pub fn load_registry(config: &ServiceConfig) -> Result<(Registry, LoadReport)> {
    let dir = &config.download.projects_dir;
    ensure_projects_dir(dir)?;

    let (registry, report) =
        Registry::load_dir(dir, &config.refresh_settings(), &connector(config))
            .with_context(|| format!("Failed to read projects directory {}", dir.display()))?;

    if registry.is_empty() {
        warn!("No projects loaded from {}", dir.display());
    }
    if report.has_failures() {
        error!(
            skipped = report.skipped.len(),
            "Some project schemas could not be loaded"
        );
    }
    info!(projects = registry.len(), "Registry loaded");
    Ok((registry, report))
}

/// Run the service until Ctrl-C or SIGTERM
pub async fn run(config: ServiceConfig) -> Result<()> {
    let (registry, _) = load_registry(&config)?;
    let registry = Arc::new(registry);

    info!("Running initial refresh");
    registry.refresh_all().await;

    let mut scheduler = Scheduler::new(registry.clone(), config.schedule());
    scheduler.start();

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let router = api::router(registry, config.api_prefix());
    let served = api::serve(listener, router, shutdown_signal()).await;

    scheduler.stop().await;
    served.context("HTTP server failed")?;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown requested");
}
