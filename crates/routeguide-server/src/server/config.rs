use anyhow::bail;
use clap::Parser;
use routeguide_core::Error;
use tonic::metadata::{Ascii, MetadataValue};

/// Runtime configuration for the `routeguide-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is honored), with defaults suitable for a local demo.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "routeguide-server",
    version,
    about = "A route guide gRPC service that injects random faults"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Probability (0.0 - 1.0) that a call fails with an injected
    /// `UNAVAILABLE` fault instead of reaching the service.
    ///
    /// Health checks are never faulted.
    ///
    /// Environment variable: `FAULT_PERCENT`
    #[arg(long, env = "FAULT_PERCENT", default_value_t = 0.3)]
    pub fault_percent: f64,

    /// Name echoed back to clients in the `server` response metadata, so
    /// load-balanced clients can tell replicas apart.
    ///
    /// Environment variable: `SERVER_NAME`
    #[arg(long, env = "SERVER_NAME")]
    pub server_name: Option<String>,

    /// Capacity of the channel between a streaming handler and its response
    /// stream.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 16)]
    pub stream_buffer_size: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub fault_probability: f64,
    pub server_name: Option<String>,
    pub stream_buffer_size: usize,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if !(0.0..=1.0).contains(&args.fault_percent) {
            return Err(Error::InvalidConfiguration {
                reason: format!(
                    "FAULT_PERCENT ({}) must be between 0.0 and 1.0",
                    args.fault_percent
                ),
            }
            .into());
        }

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if let Some(name) = &args.server_name {
            if name.parse::<MetadataValue<Ascii>>().is_err() {
                bail!("SERVER_NAME ({name:?}) is not a valid metadata value");
            }
        }

        Ok(Self {
            server_addr: args.server_addr,
            fault_probability: args.fault_percent,
            server_name: args.server_name,
            stream_buffer_size: args.stream_buffer_size,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: String::from("0.0.0.0:8080"),
            fault_probability: 0.0,
            server_name: None,
            stream_buffer_size: 16,
        }
    }
}
