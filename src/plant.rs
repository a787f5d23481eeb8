// Plant service binary entry point

// Service modules
mod config;
mod error;
mod repo;
mod router;

// Handlers module
#[path = "plant/handlers/mod.rs"]
mod handlers;

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cement_plant::{
    ConnectionRegistry, MemoryStore, PlantOrchestrator, RandomIdGenerator, SchedulerHandle, Store,
    SystemClock,
};
use config::{dynamodb_client, Config, StoreBackend};
use handlers::AppState;
use repo::DynamoStore;
use router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    let Service {
        listener,
        state,
        scheduler,
        store,
    } = start(&config).await?;
    info!(addr = %config.bind_addr, "Plant service listening");

    let served = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = &served {
        error!(error = %e, "HTTP server failed");
    }

    info!("Stopping scheduler");
    scheduler.shutdown().await;

    if let Err(e) = store.close().await {
        warn!(error = %e, "Failed to close store");
    }
    info!("Plant service stopped");

    served.map_err(Into::into)
}

/// A bound listener and a running pipeline, ready to serve
struct Service {
    listener: TcpListener,
    state: Arc<AppState>,
    scheduler: SchedulerHandle,
    store: Arc<dyn Store>,
}

/// Bind the listener, open the store, then start the scheduler.
///
/// The listener comes first: when the port is taken no store is opened and
/// no job ever ticks.
async fn start(config: &Config) -> anyhow::Result<Service> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    let store: Arc<dyn Store> = match &config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::DynamoDb { table } => {
            info!(table = %table, "Using DynamoDB store");
            Arc::new(DynamoStore::new(dynamodb_client().await, table.clone()))
        }
    };

    let registry = Arc::new(ConnectionRegistry::new());
    let orchestrator = Arc::new(PlantOrchestrator::new(
        store.clone(),
        registry.clone(),
        Arc::new(SystemClock::new()),
        config.pipeline.clone(),
    ));

    let scheduler = orchestrator.scheduler().start();

    let state = Arc::new(AppState {
        orchestrator,
        registry,
        ids: Arc::new(RandomIdGenerator::new()),
        subscriber_buffer: config.subscriber_buffer,
    });

    Ok(Service {
        listener,
        state,
        scheduler,
        store,
    })
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
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
                warn!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn config_for(addr: SocketAddr) -> Config {
        Config::from_lookup(|name| match name {
            "BIND_ADDR" => Some(addr.to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_taken_port_fails_before_startup() {
        let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = config_for(held.local_addr().unwrap());

        let err = start(&config).await.err().unwrap();

        assert!(format!("{:#}", err).contains("Failed to bind"));
    }

    #[tokio::test]
    async fn test_start_then_stop() {
        let config = config_for(SocketAddr::from(([127, 0, 0, 1], 0)));

        let service = start(&config).await.unwrap();
        assert!(service.listener.local_addr().unwrap().port() > 0);
        assert!(service.state.registry.connections().await.is_empty());

        service.scheduler.shutdown().await;
        service.store.close().await.unwrap();
    }
}
