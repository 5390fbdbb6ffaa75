use crate::streaming::coordinator::FanOutConfig;
use anyhow::bail;
use clap::{Parser, Subcommand};
use core::time::Duration;
use spfinder_core::{Address, DEFAULT_GATEWAY, DEFAULT_WORKERS, gateway_url};
use url::Url;

/// Command-line surface of the `spfinder` binary.
///
/// Every option can also be supplied through the environment (or a `.env`
/// file in the working directory).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "spfinder",
    version,
    about = "Resolve peer ids, multiaddresses and asks of storage providers"
)]
pub struct CliArgs {
    /// Gateway host serving the chain-state JSON-RPC API.
    ///
    /// Only the host (and optional port) is configurable; requests always go
    /// to `https://<gateway>/rpc/v0`.
    ///
    /// Environment variable: `SPFINDER_GATEWAY`
    #[arg(long, global = true, env = "SPFINDER_GATEWAY", default_value_t = String::from(DEFAULT_GATEWAY))]
    pub gateway: String,

    /// Number of providers resolved concurrently in batch commands.
    ///
    /// The gateway is rate sensitive; raising this trades politeness for
    /// speed.
    ///
    /// Environment variable: `SPFINDER_WORKERS`
    #[arg(long, global = true, env = "SPFINDER_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Number of finished lines buffered ahead of the output.
    ///
    /// Environment variable: `SPFINDER_RESULT_BUFFER`
    #[arg(long, global = true, env = "SPFINDER_RESULT_BUFFER", default_value_t = 64)]
    pub result_buffer: usize,

    /// Upper bound in seconds for each gateway request. Unset waits
    /// indefinitely.
    ///
    /// Environment variable: `SPFINDER_TIMEOUT_SECS`
    #[arg(long, global = true, env = "SPFINDER_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the peer id and multiaddresses of one storage provider.
    Find {
        /// Storage provider address, e.g. `f01000`.
        #[arg(
            long = "storage_provider_id",
            visible_alias = "storage-provider-id",
            required = true
        )]
        storage_provider_id: String,
    },
    /// Print the peer id of every storage market participant.
    Populate,
    /// Print the storage ask of every storage market participant.
    QueryAsks,
}

/// What a validated invocation should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Find { provider: Address },
    Populate,
    QueryAsks,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub endpoint: Url,
    pub timeout: Option<Duration>,
    pub fan_out: FanOutConfig,
    pub mode: Mode,
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.workers == 0 {
            bail!("SPFINDER_WORKERS must be greater than 0");
        }
        if args.result_buffer == 0 {
            bail!("SPFINDER_RESULT_BUFFER must be greater than 0");
        }

        let timeout = match args.timeout_secs {
            Some(0) => bail!("SPFINDER_TIMEOUT_SECS must be greater than 0"),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let mode = match args.command {
            Command::Find {
                storage_provider_id,
            } => Mode::Find {
                provider: storage_provider_id.parse()?,
            },
            Command::Populate => Mode::Populate,
            Command::QueryAsks => Mode::QueryAsks,
        };

        Ok(Self {
            endpoint: gateway_url(&args.gateway)?,
            timeout,
            fan_out: FanOutConfig {
                num_workers: args.workers,
                work_buffer_size: args.workers,
                result_buffer_size: args.result_buffer,
            },
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("spfinder").chain(args.iter().copied()))
    }

    #[test]
    fn find_uses_underscored_flag_and_defaults() {
        let args = parse(&["find", "--storage_provider_id=f01000"]).unwrap();
        let config = AppConfig::try_from(args).unwrap();

        assert_eq!(config.endpoint.as_str(), "https://api.node.glif.io/rpc/v0");
        assert_eq!(config.fan_out.num_workers, 20);
        assert_eq!(config.timeout, None);
        assert_eq!(
            config.mode,
            Mode::Find {
                provider: "f01000".parse().unwrap()
            }
        );
    }

    #[test]
    fn gateway_is_accepted_after_the_subcommand() {
        let args = parse(&["populate", "--gateway", "localhost:1234", "--workers", "5"]).unwrap();
        let config = AppConfig::try_from(args).unwrap();

        assert_eq!(config.endpoint.as_str(), "https://localhost:1234/rpc/v0");
        assert_eq!(config.fan_out.num_workers, 5);
        assert_eq!(config.mode, Mode::Populate);
    }

    #[test]
    fn query_asks_subcommand_name() {
        let args = parse(&["query-asks", "--timeout-secs", "30"]).unwrap();
        let config = AppConfig::try_from(args).unwrap();

        assert_eq!(config.mode, Mode::QueryAsks);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn find_requires_provider() {
        let err = parse(&["find"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn invalid_values_fail_validation() {
        let args = parse(&["find", "--storage_provider_id", "not-an-address"]).unwrap();
        assert!(AppConfig::try_from(args).is_err());

        let args = parse(&["populate", "--workers", "0"]).unwrap();
        assert!(AppConfig::try_from(args).is_err());

        let args = parse(&["populate", "--gateway", "https://example.com"]).unwrap();
        assert!(AppConfig::try_from(args).is_err());
    }
}
