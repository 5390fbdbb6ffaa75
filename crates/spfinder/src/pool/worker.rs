use crate::{
    outcome::ResultLine,
    resolver::Resolver,
    telemetry::{decrement_workers_busy, increment_workers_busy, record_item},
};
use core::panic::AssertUnwindSafe;
use futures::FutureExt;
use spfinder_core::ProviderId;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Work queue shared by every worker of a batch.
///
/// Tokio's MPSC receiver has a single consumer, so workers take turns holding
/// it. The lock is only held while waiting for the next provider, never while
/// resolving one.
pub type SharedQueue = Arc<Mutex<mpsc::Receiver<ProviderId>>>;

/// Worker task that pulls providers off the shared queue until it is closed
/// and drained.
///
/// Each iteration walks the same states: fetch work, resolve it, publish the
/// [`ResultLine`]. The worker terminates when the queue is closed and empty,
/// when the result consumer has gone away, or when `shutdown` is cancelled.
///
/// # Arguments
///
/// - `worker_id`: Numeric identifier for this worker (used for logs/tracing).
/// - `queue`: Shared receiver of providers still to resolve.
/// - `resolver`: Strategy applied to each provider.
/// - `results`: Sender for finished lines. Dropped on exit.
/// - `shutdown`: Batch-wide cancellation token.
///
/// A panicking resolver does not take the worker down with it; the panic is
/// reported as a failed line for the provider being resolved.
pub async fn worker_loop<R: Resolver>(
    worker_id: usize,
    queue: SharedQueue,
    resolver: Arc<R>,
    results: mpsc::Sender<ResultLine>,
    shutdown: CancellationToken,
) {
    tracing::trace!("Worker {worker_id} started");

    loop {
        let next = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                () = shutdown.cancelled() => None,
                provider = rx.recv() => provider,
            }
        };
        let Some(provider) = next else {
            break;
        };

        increment_workers_busy();
        let span = tracing::info_span!("resolve", provider = %provider);
        let resolved = tokio::select! {
            biased;
            () = shutdown.cancelled() => None,
            line = resolve_guarded(&*resolver, &provider).instrument(span) => Some(line),
        };
        decrement_workers_busy();

        let Some(line) = resolved else {
            tracing::debug!("Worker {worker_id} abandoned {provider} on shutdown");
            break;
        };

        record_item(&line.outcome);
        if results.send(line).await.is_err() {
            tracing::debug!("Worker {worker_id}: result receiver dropped");
            break;
        }
    }

    tracing::trace!("Worker {worker_id} stopped");
}

async fn resolve_guarded<R: Resolver>(resolver: &R, provider: &ProviderId) -> ResultLine {
    match AssertUnwindSafe(resolver.resolve(provider))
        .catch_unwind()
        .await
    {
        Ok(line) => line,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Resolver panicked on {provider}: {reason}");
            ResultLine::failed(provider, format_args!("resolver panicked: {reason}"))
        }
    }
}
