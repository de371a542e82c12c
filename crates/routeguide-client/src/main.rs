#![doc = include_str!("../README.md")]

mod client;

use clap::Parser;
use client::calls::RouteGuideCaller;
use client::config::{CliArgs, ClientConfig, Mode};
use client::driver::Driver;
use client::telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ClientConfig::try_from(args)?;

    init_telemetry()?;

    let channel = client::connect(&config).await?;
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let mut driver = Driver::new(
        RouteGuideCaller::new(channel),
        config.timeout,
        config.wait,
        cancel,
    );

    tracing::info!("Running in {} mode", config.mode);
    let res = match config.mode {
        Mode::RepeatN => driver.run_bounded(config.api, config.repeat).await,
        Mode::Firehose => driver.run_firehose().await,
    };

    // The driver already logged the failing call.
    res?;
    tracing::info!("Finished");
    Ok(())
}

async fn cancel_on_signal(cancel: CancellationToken) {
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

    tracing::info!("Stopping");
    cancel.cancel();
}
