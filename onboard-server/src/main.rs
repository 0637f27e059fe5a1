use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use onboard_cache::{CacheAside, MemoryCache};
use onboard_model::{Book, Entity, User};
use onboard_rpc::RpcServer;
use onboard_server::{AppState, Config, build_router};
use onboard_service::EntityServices;
use onboard_store::{Collection, DocumentStore, SqliteDocumentStore};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    info!("onboard starting...");

    let store = match config.store_path() {
        Some(path) => {
            info!("Opening database at {}", path.display());
            SqliteDocumentStore::open(&path)
                .with_context(|| format!("failed to open database at {}", path.display()))?
        }
        None => {
            warn!("DATABASE_PATH not set, data is kept in memory only");
            SqliteDocumentStore::open_in_memory().context("failed to open in-memory store")?
        }
    };
    store
        .ensure_collections(&[User::COLLECTION, Book::COLLECTION])
        .await
        .context("failed to prepare collections")?;
    let store: Arc<dyn DocumentStore> = Arc::new(store);

    let cache = if config.no_cache {
        info!("List cache disabled");
        None
    } else {
        Some(CacheAside::new(Arc::new(MemoryCache::new())))
    };

    let service_config = config.service_config();
    let users = EntityServices::new(Collection::new(Arc::clone(&store)), cache.clone(), service_config);
    let books = EntityServices::new(Collection::new(store), cache, service_config);

    let http_listener = TcpListener::bind(config.http_addr())
        .await
        .with_context(|| format!("failed to bind HTTP port {}", config.port))?;
    let rpc_listener = TcpListener::bind(config.rpc_addr())
        .await
        .with_context(|| format!("failed to bind RPC port {}", config.rpc_port))?;
    info!("HTTP listening on {}", http_listener.local_addr()?);
    info!("RPC listening on {}", rpc_listener.local_addr()?);

    let (stop_tx, stop_rx) = watch::channel(false);

    let rpc_server = RpcServer::new(users.clone(), books.clone());
    let mut rpc_stop = stop_rx.clone();
    let rpc_task = tokio::spawn(async move {
        rpc_server
            .serve(rpc_listener, async move {
                let _ = rpc_stop.wait_for(|stopped| *stopped).await;
            })
            .await;
    });

    let app = build_router(AppState::new(users, books, config.credentials()));
    axum::serve(http_listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown requested");
            let _ = stop_tx.send(true);
        })
        .await
        .context("HTTP server failed")?;

    rpc_task.await.context("RPC server task failed")?;
    info!("onboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
