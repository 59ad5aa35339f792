//! Asynchronous worker pool for cache-miss backfill.
//!
//! This module defines the [`WorkerPool`] struct, which owns a bounded request
//! queue drained by a fixed set of fetch workers. Callers submit a
//! [`WorkRequest::Fetch`] carrying a one-shot reply slot and await that slot;
//! the queue's capacity is the admission limit for concurrent misses.
//!
//! Shutdown is coordinated through a shared [`CancellationToken`] and an
//! in-flight counter: new fetches are refused first, in-flight ones are given
//! time to drain, and only then is every worker told to stop.

use super::{request::WorkRequest, worker::worker_loop};
use crate::{
    cache::RecordCache,
    config::ServiceConfig,
    error::{Error, Result},
    record::{Record, RecordId},
    store::Store,
};
use core::time::Duration;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::{
    sync::{Mutex, mpsc, oneshot},
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;

/// How long shutdown waits for each worker to acknowledge.
const WORKER_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// Decrements the in-flight counter when a fetch completes or its future is
/// dropped (for example by a caller-side timeout).
struct InflightGuard<'a>(&'a AtomicUsize);

impl<'a> InflightGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A cooperative pool of asynchronous workers that resolve cache misses.
///
/// Workers share a single bounded MPSC queue. Each request carries its own
/// reply slot, and the pool supports graceful, cancellable shutdown.
pub struct WorkerPool {
    queue: mpsc::Sender<WorkRequest>,
    num_workers: usize,
    inflight: AtomicUsize,
    stopped: AtomicBool,
    shutdown_token: CancellationToken,
    drain_timeout: Duration,
}

impl WorkerPool {
    /// Creates the request queue and spawns `config.num_workers` workers on
    /// the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, or if `num_workers` or
    /// `queue_capacity` is zero.
    pub fn spawn<S: Store>(config: &ServiceConfig, store: Arc<S>, cache: Arc<RecordCache>) -> Self {
        assert!(config.num_workers > 0, "worker pool needs at least one worker");

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let queue = Arc::new(Mutex::new(rx));
        let table: Arc<str> = Arc::from(config.table_name.as_str());

        for worker_id in 0..config.num_workers {
            tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&store),
                Arc::clone(&cache),
                Arc::clone(&table),
            ));
        }

        Self {
            queue: tx,
            num_workers: config.num_workers,
            inflight: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
            drain_timeout: config.drain_timeout,
        }
    }

    /// Submits a fetch for `id` and waits for its reply.
    ///
    /// Suspends while the queue is full. With `limit` set, the whole wait
    /// (queue admission plus reply) is bounded; on expiry the request either
    /// never entered the queue or is discarded unread by the worker that
    /// dequeues it.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] once shutdown has started.
    /// - [`Error::Timeout`] if `limit` elapses.
    /// - [`Error::NotFound`] / [`Error::StoreUnavailable`] as resolved by the
    ///   worker.
    /// - [`Error::ChannelError`] if the queue or reply slot broke.
    pub async fn fetch(&self, id: RecordId, limit: Option<Duration>) -> Result<Record> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let _inflight = InflightGuard::new(&self.inflight);
        match limit {
            Some(limit) => timeout(limit, self.submit(id))
                .await
                .map_err(|_| Error::Timeout { id })?,
            None => self.submit(id).await,
        }
    }

    async fn submit(&self, id: RecordId) -> Result<Record> {
        let (reply, rx) = oneshot::channel();

        if self.queue.send(WorkRequest::Fetch { id, reply }).await.is_err() {
            return Err(self.closed_error(format!("request queue closed while submitting {id}")));
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.closed_error(format!("reply slot for {id} dropped"))),
        }
    }

    fn closed_error(&self, context: String) -> Error {
        if self.shutdown_token.is_cancelled() {
            Error::ServiceShutdown
        } else {
            Error::ChannelError { context }
        }
    }

    /// Number of fetches currently submitted or waiting for admission.
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    /// Number of requests sitting in the queue, not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }

    pub const fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Cancels the shared [`CancellationToken`] to refuse new fetches.
    /// - Waits (up to the configured drain timeout) for in-flight fetches.
    /// - Sends a [`WorkRequest::Shutdown`] to each worker and waits (up to 3
    ///   seconds per worker) for acknowledgements.
    ///
    /// Calling it again after the first call returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelError`] if the queue closed early or some
    /// workers never acknowledged (their notice could not be queued or their
    /// ack timed out). The pool still refuses new fetches in that case.
    pub async fn shutdown(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // === Phase 0: Stop accepting new requests ===
        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new fetch requests");
        self.shutdown_token.cancel();

        // === Phase 1: Wait for in-flight fetches to drain ===
        #[cfg(feature = "tracing")]
        tracing::info!("Draining in-flight fetches ({} active)", self.inflight());
        let drain_result = timeout(self.drain_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("All in-flight fetches drained");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Graceful drain timed out ({} fetches still active)",
                    self.inflight()
                );
            }
        }

        // === Phase 2: Notify workers to shut down ===
        // Shutdown messages queue behind any fetch still waiting, so those are
        // answered before the workers exit. Each worker consumes exactly one.
        #[cfg(feature = "tracing")]
        tracing::debug!("Notifying all workers to shut down");
        let mut acks = Vec::with_capacity(self.num_workers);
        for _i in 0..self.num_workers {
            let (tx, rx) = oneshot::channel();
            let notice = WorkRequest::Shutdown { response: tx };
            match timeout(WORKER_ACK_TIMEOUT, self.queue.send(notice)).await {
                Ok(Ok(())) => acks.push((_i, rx)),
                Ok(Err(_e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Failed to send shutdown notice {_i}: {_e}");
                    return Err(Error::ChannelError {
                        context: "request queue closed before shutdown".to_string(),
                    });
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Queue still full, skipping shutdown notice {_i}");
                }
            }
        }

        let ack_futures = acks.into_iter().map(|(_i, rx)| async move {
            match timeout(WORKER_ACK_TIMEOUT, rx).await {
                Ok(Ok(())) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Shutdown notice {_i} acknowledged");
                    true
                }
                Ok(Err(_e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Shutdown notice {_i} dropped: {_e}");
                    false
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Shutdown notice {_i} timed out");
                    false
                }
            }
        });

        let stopped = futures::future::join_all(ack_futures)
            .await
            .into_iter()
            .filter(|acked| *acked)
            .count();

        if stopped < self.num_workers {
            let missing = self.num_workers - stopped;
            #[cfg(feature = "tracing")]
            tracing::error!(
                "Worker pool shutdown incomplete: {missing} of {} workers still running",
                self.num_workers
            );
            return Err(Error::ChannelError {
                context: format!(
                    "{missing} of {} workers did not acknowledge shutdown",
                    self.num_workers
                ),
            });
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Worker pool shutdown complete");

        Ok(())
    }
}
