#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::config::{CliArgs, ServerConfig};
use server::store::FeatureStore;
use server::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;

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

    // A malformed dataset must stop the process before it listens.
    let features = FeatureStore::embedded()?;

    let listener = TcpListener::bind(&config.server_addr).await?;
    log_startup_info(&config, &features);

    let res = server::serve(
        TcpListenerStream::new(listener),
        config,
        features,
        shutdown_signal(),
    )
    .await;

    match &res {
        Ok(()) => tracing::info!("Service shut down successfully"),
        Err(e) => tracing::error!("Service failed: {e:#}"),
    }
    providers.shutdown();
    res
}

fn log_startup_info(config: &ServerConfig, features: &FeatureStore) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting route guide on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting route guide on {} (fault probability {:.0}%)",
            config.server_addr,
            config.fault_probability * 100.0
        );
    }
    if features.is_empty() {
        tracing::warn!("Feature dataset is empty, every lookup will miss");
    } else {
        let named = features.iter().filter(|f| f.is_found()).count();
        tracing::info!("Loaded {} features ({named} named)", features.len());
    }
}

async fn shutdown_signal() {
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
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}
