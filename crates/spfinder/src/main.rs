use clap::Parser;
use spfinder::cli::{
    commands,
    config::{AppConfig, CliArgs},
};
use spfinder::telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = parse_args();
    let config = AppConfig::try_from(args)?;

    let providers = init_telemetry()?;
    if cfg!(debug_assertions) {
        tracing::debug!("Starting with full config: {config:#?}");
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_interrupt(shutdown.clone()));

    let mut stdout = std::io::stdout();
    let res = commands::run(config, shutdown, &mut stdout).await;

    providers.shutdown();
    res
}

/// Parses the command line, exiting with status 1 on usage errors. `--help`
/// and `--version` still exit successfully.
fn parse_args() -> CliArgs {
    match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    }
}

async fn cancel_on_interrupt(shutdown: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("Interrupted, cancelling in-flight lookups");
            shutdown.cancel();
        }
        Err(e) => tracing::error!("Failed to install Ctrl+C handler: {e}"),
    }
}
