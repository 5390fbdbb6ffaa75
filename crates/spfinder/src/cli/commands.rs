//! Command implementations.
//!
//! Output goes to the supplied writer (stdout in the binary); diagnostics go
//! through `tracing`. `find` fails on any error. The batch commands only fail
//! if the participant list cannot be fetched or the output cannot be written;
//! per-provider failures are printed inline.

use super::config::{AppConfig, Mode};
use crate::{
    outcome::Tally,
    resolver::{PeerIdResolver, QueryAskResolver, Resolver},
    streaming::coordinator::{FanOutConfig, fan_out},
};
use anyhow::Context;
use futures::StreamExt;
use spfinder_core::{Error, Gateway, GatewayClient, PeerAddrInfo, ProviderId};
use std::{io::Write, sync::Arc};
use tokio_util::sync::CancellationToken;

/// Result of a single-provider lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindReport {
    pub addr_info: PeerAddrInfo,
    pub market_size: usize,
}

/// Runs the command selected by `config` against the configured gateway.
pub async fn run(
    config: AppConfig,
    shutdown: CancellationToken,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let gateway = Arc::new(
        GatewayClient::new(config.endpoint.clone(), config.timeout)
            .context("failed to build gateway client")?,
    );
    tracing::info!("Using gateway {}", gateway.endpoint());

    match config.mode {
        Mode::Find { provider } => {
            let provider = ProviderId::from(provider);
            let report = tokio::select! {
                report = find(&*gateway, &provider) => report?,
                () = shutdown.cancelled() => return Err(Error::Cancelled.into()),
            };
            print_find_report(&report, out)?;
        }
        Mode::Populate => {
            writeln!(out, "Populating...")?;
            let resolver = Arc::new(PeerIdResolver::new(Arc::clone(&gateway)));
            run_batch(&*gateway, resolver, &config.fan_out, shutdown, out).await?;
        }
        Mode::QueryAsks => {
            writeln!(out, "Populating...")?;
            let resolver = Arc::new(QueryAskResolver::new(Arc::clone(&gateway)));
            run_batch(&*gateway, resolver, &config.fan_out, shutdown, out).await?;
        }
    }

    Ok(())
}

/// Looks up one provider: chain head, miner record pinned to that head, and
/// the size of the market participant table.
///
/// # Errors
///
/// Fails on any gateway error, or with [`Error::MissingPeerId`] when the
/// provider advertises no peer identity.
#[tracing::instrument(skip_all, fields(provider = %provider))]
pub async fn find<G: Gateway>(gateway: &G, provider: &ProviderId) -> anyhow::Result<FindReport> {
    let head = gateway
        .chain_head()
        .await
        .context("failed to fetch chain head")?;
    tracing::debug!("Chain head at height {}", head.height);

    let info = gateway
        .state_miner_info(provider, Some(&head.key))
        .await
        .with_context(|| format!("failed to fetch miner info for {provider}"))?;

    let participants = gateway
        .state_market_participants(None)
        .await
        .context("failed to fetch market participants")?;

    let addr_info = info.peer_addr_info().ok_or_else(|| Error::MissingPeerId {
        provider: provider.to_string(),
    })?;

    Ok(FindReport {
        addr_info,
        market_size: participants.len(),
    })
}

pub fn print_find_report(report: &FindReport, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "PeerID: {}", report.addr_info.id)?;
    if !report.addr_info.addrs.is_empty() {
        writeln!(out, "Addrs:")?;
        for addr in &report.addr_info.addrs {
            writeln!(out, "   {addr}")?;
        }
    }
    writeln!(out, "Miner List Size:  {}", report.market_size)
}

/// Fetches every market participant and resolves them with `resolver`,
/// printing each line as soon as it is available, followed by a tally.
#[tracing::instrument(
    skip_all,
    fields(workers = config.num_workers, providers = tracing::field::Empty)
)]
pub async fn run_batch<G, R>(
    gateway: &G,
    resolver: Arc<R>,
    config: &FanOutConfig,
    shutdown: CancellationToken,
    out: &mut impl Write,
) -> anyhow::Result<Tally>
where
    G: Gateway,
    R: Resolver,
{
    let participants = gateway
        .state_market_participants(None)
        .await
        .context("failed to fetch market participants")?;
    tracing::Span::current().record("providers", participants.len() as u64);
    tracing::info!(
        "Resolving {} market participants with {} workers",
        participants.len(),
        config.num_workers
    );

    let mut tally = Tally::default();
    let mut results = fan_out(participants.into_keys(), resolver, config, shutdown.clone());
    while let Some(line) = results.next().await {
        writeln!(out, "{line}")?;
        tally.record(&line);
    }
    let summary = results.finish().await;

    if shutdown.is_cancelled() {
        tracing::warn!(
            "Batch cancelled after {} of {} providers",
            tally.total(),
            summary.submitted
        );
    }
    writeln!(out, "{tally}")?;
    Ok(tally)
}
