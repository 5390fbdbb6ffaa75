use crate::{
    outcome::ResultLine,
    pool::manager::WorkerPool,
    resolver::Resolver,
    telemetry::{increment_batches, record_batch_duration, record_batch_size},
};
use core::{
    pin::Pin,
    task::{Context, Poll},
};
use futures::{Stream, StreamExt};
use spfinder_core::{DEFAULT_WORKERS, ProviderId};
use std::{sync::Arc, time::Instant};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Sizing of a single fan-out run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutConfig {
    /// Number of concurrent workers. Must be at least 1.
    pub num_workers: usize,
    /// Capacity of the queue between the feeder and the workers.
    pub work_buffer_size: usize,
    /// Capacity of the queue between the workers and the consumer. A full
    /// queue suspends the workers until the consumer catches up.
    pub result_buffer_size: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_WORKERS,
            work_buffer_size: DEFAULT_WORKERS,
            result_buffer_size: 64,
        }
    }
}

/// Applies `resolver` to every provider in `providers` using a fixed pool of
/// workers, returning the lines as a stream in completion order.
///
/// Three kinds of task cooperate:
///
/// - a feeder that pushes every provider into the work queue and then closes
///   it,
/// - `config.num_workers` workers that pull, resolve and publish until the
///   queue is closed and drained,
/// - a supervisor that joins all workers before releasing the last result
///   sender, so the stream ends only after every worker has finished.
///
/// Without cancellation, exactly one line is produced per distinct provider.
/// Cancelling `shutdown` stops the feeder and the workers early, in which case
/// the stream ends with whatever was finished.
///
/// Must be called from within a Tokio runtime.
pub fn fan_out<I, R>(
    providers: I,
    resolver: Arc<R>,
    config: &FanOutConfig,
    shutdown: CancellationToken,
) -> ResultStream
where
    I: IntoIterator<Item = ProviderId>,
    I::IntoIter: Send + 'static,
    R: Resolver,
{
    let num_workers = config.num_workers.max(1);
    let (work_tx, work_rx) = mpsc::channel(config.work_buffer_size.max(1));
    let (result_tx, result_rx) = mpsc::channel(config.result_buffer_size.max(1));

    increment_batches();
    let pool = WorkerPool::spawn(num_workers, work_rx, resolver, &result_tx, &shutdown);
    tracing::debug!("Spawned {} workers", pool.len());

    let feeder = tokio::spawn(feed(providers.into_iter(), work_tx, shutdown));

    let supervisor = tokio::spawn(async move {
        let start = Instant::now();
        let submitted = match feeder.await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Feeder terminated abnormally: {e}");
                0
            }
        };
        let failed_workers = pool.join().await;
        // All workers are gone; releasing this sender closes the stream.
        drop(result_tx);

        record_batch_size(submitted as f64);
        record_batch_duration(start.elapsed().as_millis() as f64);
        tracing::info!(
            "Batch finished: {submitted} providers submitted in {:?}",
            start.elapsed()
        );
        BatchSummary {
            submitted,
            failed_workers,
        }
    });

    ResultStream {
        results: ReceiverStream::new(result_rx),
        supervisor,
    }
}

/// Pushes every provider into the work queue, then closes it by dropping the
/// sender. Returns the number of providers enqueued.
async fn feed<I>(
    providers: I,
    work_tx: mpsc::Sender<ProviderId>,
    shutdown: CancellationToken,
) -> usize
where
    I: Iterator<Item = ProviderId>,
{
    let mut submitted = 0;
    for provider in providers {
        let sent = tokio::select! {
            biased;
            () = shutdown.cancelled() => false,
            res = work_tx.send(provider) => res.is_ok(),
        };
        if !sent {
            tracing::debug!("Feeder stopped after {submitted} providers");
            break;
        }
        submitted += 1;
    }
    submitted
}

/// Bookkeeping of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Providers handed to the workers.
    pub submitted: usize,
    /// Workers that did not terminate cleanly.
    pub failed_workers: usize,
}

/// Lines of a running batch, in completion order.
///
/// The stream ends once every worker has terminated. Dropping it early makes
/// the workers stop after their current provider.
pub struct ResultStream {
    results: ReceiverStream<ResultLine>,
    supervisor: JoinHandle<BatchSummary>,
}

impl ResultStream {
    /// Drains the stream into a vector.
    pub async fn collect_lines(mut self) -> Vec<ResultLine> {
        let mut lines = Vec::new();
        while let Some(line) = self.next().await {
            lines.push(line);
        }
        lines
    }

    /// Waits for the run to wind down and returns its bookkeeping.
    ///
    /// Remaining lines are discarded; consume the stream first to keep them.
    pub async fn finish(self) -> BatchSummary {
        drop(self.results);
        match self.supervisor.await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Batch supervisor terminated abnormally: {e}");
                BatchSummary::default()
            }
        }
    }
}

impl Stream for ResultStream {
    type Item = ResultLine;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.results).poll_next(cx)
    }
}
