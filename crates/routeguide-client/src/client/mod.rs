//! Client-side components of the route guide driver.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration.
//! - [`payload`] - Random points, rectangles and chat notes.
//! - [`calls`] - The four route guide operations over a channel.
//! - [`driver`] - Bounded and firehose loops with fault classification.
//! - [`telemetry`] - Console logging.

pub mod calls;
pub mod config;
pub mod driver;
pub mod payload;
pub mod telemetry;

use config::ClientConfig;
use tonic::transport::Channel;

/// Opens the channel described by `config`.
///
/// With load balancing the channel spreads calls round-robin over every seed
/// endpoint and connects lazily; otherwise it connects to the single endpoint
/// up front so an unreachable server fails fast.
pub async fn connect(config: &ClientConfig) -> anyhow::Result<Channel> {
    let mut endpoints = config
        .endpoints
        .iter()
        .cloned()
        .map(|e| e.connect_timeout(config.timeout));

    if config.load_balanced {
        tracing::info!(
            "Balancing across {} servers: {:?}",
            config.endpoints.len(),
            config.endpoints.iter().map(|e| e.uri()).collect::<Vec<_>>()
        );
        return Ok(Channel::balance_list(endpoints));
    }

    let Some(endpoint) = endpoints.next() else {
        anyhow::bail!("No server endpoint configured");
    };
    tracing::info!("Connecting to server at {}", endpoint.uri());
    Ok(endpoint.connect().await?)
}
