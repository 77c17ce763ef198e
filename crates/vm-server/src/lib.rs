//! vm-server: HTTP API, periodic scheduler, and SSE event stream.
//!
//! This crate wires the consolidation engine to a running service:
//!
//! - Axum-based HTTP API for the batch operations and single-item split
//! - Scheduler that periodically merges movies and episodes
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod scheduler;
pub mod tasks;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vm_core::config::Config;
use vm_core::Catalog;
use vm_db::SqliteCatalog;

use crate::context::AppContext;

/// Start the versionmerge server.
///
/// Opens the catalog database, constructs the [`AppContext`], spawns the
/// scheduler, and serves HTTP until a shutdown signal is received.
pub async fn start(config: Config) -> vm_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    let db = vm_db::pool::init_pool(db_path)?;
    if existed {
        tracing::info!("Database opened (existing) at {}", db_path.display());
    } else {
        tracing::info!("Database created (new) at {}", db_path.display());
    }

    let catalog: Arc<dyn Catalog> = Arc::new(SqliteCatalog::new(db));
    let cancel = CancellationToken::new();
    let ctx = AppContext::new(catalog, config, cancel.clone());

    let scheduler = tokio::spawn(scheduler::run_scheduler(ctx.clone(), cancel.clone()));

    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .map_err(|e| vm_core::Error::Internal(format!("Invalid bind address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    let app = router::build_router(ctx);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    if let Err(e) = scheduler.await {
        tracing::error!("Scheduler task failed: {e}");
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C, SIGTERM, or cancellation of `cancel`.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_signal_resolves_on_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), shutdown_signal(cancel))
            .await
            .expect("shutdown_signal should resolve once cancelled");
    }
}
