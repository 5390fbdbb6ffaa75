//! Fixed-size pool of resolution workers.
//!
//! This module defines the [`WorkerPool`] struct, which spawns a set of
//! asynchronous workers that share one work queue and one result channel. Idle
//! workers pull the next provider themselves, so a slow gateway call only ever
//! stalls the worker that issued it.

use super::worker::{SharedQueue, worker_loop};
use crate::{outcome::ResultLine, resolver::Resolver};
use spfinder_core::ProviderId;
use std::sync::Arc;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// A set of running workers draining one work queue.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `num_workers` workers on the current Tokio runtime.
    ///
    /// Every worker receives its own clone of `results`; the channel closes only
    /// once all of them and the caller's sender are dropped.
    pub fn spawn<R: Resolver>(
        num_workers: usize,
        queue: mpsc::Receiver<ProviderId>,
        resolver: Arc<R>,
        results: &mpsc::Sender<ResultLine>,
        shutdown: &CancellationToken,
    ) -> Self {
        let queue: SharedQueue = Arc::new(Mutex::new(queue));
        let workers = (0..num_workers)
            .map(|worker_id| {
                let span = tracing::info_span!("worker", worker_id);
                tokio::spawn(
                    worker_loop(
                        worker_id,
                        Arc::clone(&queue),
                        Arc::clone(&resolver),
                        results.clone(),
                        shutdown.clone(),
                    )
                    .instrument(span),
                )
            })
            .collect();

        Self { workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Waits for every worker to terminate.
    ///
    /// Returns the number of workers that exited abnormally (panicked outside
    /// of resolution or were aborted).
    pub async fn join(self) -> usize {
        let results = futures::future::join_all(self.workers).await;
        let mut failed = 0;
        for (worker_id, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                tracing::error!("Worker {worker_id} terminated abnormally: {e}");
                failed += 1;
            }
        }
        failed
    }
}
