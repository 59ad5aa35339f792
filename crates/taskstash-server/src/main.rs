#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::backend::Backend;
use server::config::{CliArgs, ServerConfig};
use server::routes::{AppState, router};
use server::telemetry::{TelemetryProviders, init_telemetry};
use std::sync::Arc;
use taskstash::RecordService;
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let backend = Backend::open(&config).await?;
    log_startup_info(&config, &backend);

    let service = RecordService::new(config.service.clone(), Arc::new(backend));
    let state = AppState::new(service);

    let listener = TcpListener::bind(&config.server_addr).await?;
    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state, providers))
        .await?;

    #[cfg(feature = "tracing")]
    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(_config: &ServerConfig, _backend: &Backend) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting record service on {} ({} backend, region {}) with full config: {:#?}",
            _config.server_addr,
            _backend.describe(),
            _config.region,
            _config
        );
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting record service on {} ({} backend, region {}) with {} workers",
            _config.server_addr,
            _backend.describe(),
            _config.region,
            _config.service.num_workers
        );
    }
}

async fn shutdown_signal(state: AppState<Backend>, providers: TelemetryProviders) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Shutdown signal received with {} requests in flight, terminating gracefully...",
        state.requests_inflight()
    );

    // 1. Publish the status
    state.set_not_serving();

    // 2. Drain and stop the fetch workers
    if let Err(_e) = state.service.shutdown().await {
        #[cfg(feature = "tracing")]
        tracing::error!("Error during service shutdown: {:?}", _e);
    }

    let _stats = state.service.cache_stats();
    #[cfg(feature = "tracing")]
    tracing::info!(
        "Cache served {} hits and {} misses, holding {} records",
        _stats.hits,
        _stats.misses,
        _stats.entries
    );

    // 3. Flush telemetry
    providers.shutdown();
}
