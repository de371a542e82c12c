use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::{fmt, time::Duration};
use routeguide_core::Error;
use tonic::transport::Endpoint;

/// How the client drives the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Call one API a fixed number of times.
    #[value(name = "repeatn")]
    RepeatN,
    /// Call a randomly weighted API until stopped.
    #[value(name = "firehose")]
    Firehose,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RepeatN => "repeatn",
            Self::Firehose => "firehose",
        })
    }
}

/// The four route guide operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Api {
    #[value(name = "getfeature")]
    GetFeature,
    #[value(name = "listfeatures")]
    ListFeatures,
    #[value(name = "recordroute")]
    RecordRoute,
    #[value(name = "routechat")]
    RouteChat,
}

impl Api {
    pub const fn method(self) -> &'static str {
        match self {
            Self::GetFeature => "GetFeature",
            Self::ListFeatures => "ListFeatures",
            Self::RecordRoute => "RecordRoute",
            Self::RouteChat => "RouteChat",
        }
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Runtime configuration for the `routeguide-client` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is honored).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "routeguide-client",
    version,
    about = "Drives a route guide server and rides out its injected faults"
)]
pub struct CliArgs {
    /// Server URI to connect to when load balancing is off.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("http://127.0.0.1:8080"))]
    pub server: String,

    /// Per-call deadline in milliseconds.
    ///
    /// Environment variable: `TIMEOUT_MS`
    #[arg(long, env = "TIMEOUT_MS", default_value_t = 20_000)]
    pub timeout_ms: u64,

    /// Pause between two calls in milliseconds.
    ///
    /// Environment variable: `WAIT_MS`
    #[arg(long, env = "WAIT_MS", default_value_t = 3_000)]
    pub wait_ms: u64,

    /// Drive mode.
    ///
    /// Environment variable: `MODE`
    #[arg(long, env = "MODE", value_enum, ignore_case = true, default_value_t = Mode::RepeatN)]
    pub mode: Mode,

    /// API to call in `repeatn` mode.
    ///
    /// Environment variable: `API`
    #[arg(long, env = "API", value_enum, ignore_case = true, default_value_t = Api::GetFeature)]
    pub api: Api,

    /// Number of calls in `repeatn` mode.
    ///
    /// Environment variable: `REPEAT_COUNT`
    #[arg(short = 'n', env = "REPEAT_COUNT", default_value_t = 10)]
    pub n: usize,

    /// Spread calls round-robin over `--server-ipv4` instead of `--server`.
    ///
    /// Environment variable: `ENABLE_LOAD_BALANCING`
    #[arg(long, env = "ENABLE_LOAD_BALANCING")]
    pub enable_load_balancing: bool,

    /// Comma-separated `host:port` seed addresses used when load balancing.
    ///
    /// Environment variable: `SERVER_IPV4`
    #[arg(
        long,
        env = "SERVER_IPV4",
        default_value_t = String::from("127.0.0.1:8080,127.0.0.1:8081,127.0.0.1:8082")
    )]
    pub server_ipv4: String,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// A single endpoint, or every seed when load balancing.
    pub endpoints: Vec<Endpoint>,
    pub load_balanced: bool,
    pub timeout: Duration,
    pub wait: Duration,
    pub mode: Mode,
    pub api: Api,
    pub repeat: usize,
}

impl TryFrom<CliArgs> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.timeout_ms == 0 {
            return Err(Error::InvalidConfiguration {
                reason: "TIMEOUT_MS must be greater than 0".to_string(),
            }
            .into());
        }

        let endpoints = if args.enable_load_balancing {
            args.server_ipv4
                .split(',')
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .map(|addr| endpoint(&format!("http://{addr}")))
                .collect::<anyhow::Result<Vec<_>>>()?
        } else {
            vec![endpoint(&args.server)?]
        };

        if endpoints.is_empty() {
            bail!("SERVER_IPV4 must list at least one address");
        }

        Ok(Self {
            endpoints,
            load_balanced: args.enable_load_balancing,
            timeout: Duration::from_millis(args.timeout_ms),
            wait: Duration::from_millis(args.wait_ms),
            mode: args.mode,
            api: args.api,
            repeat: args.n,
        })
    }
}

fn endpoint(uri: &str) -> anyhow::Result<Endpoint> {
    match Endpoint::from_shared(uri.to_string()) {
        Ok(endpoint) => Ok(endpoint),
        Err(e) => bail!("Invalid server address {uri:?}: {e}"),
    }
}
