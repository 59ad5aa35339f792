use crate::{error::Result, record::{Record, RecordId}};
use tokio::sync::oneshot;

/// A message sent from the [`WorkerPool`](super::WorkerPool) to a fetch
/// worker.
///
/// Every [`WorkRequest::Fetch`] carries its own reply slot, so the outcome is
/// delivered to exactly the caller that submitted it no matter which worker
/// picks the request up or in which order requests complete.
#[derive(Debug)]
pub enum WorkRequest {
    /// Resolve `id` against the store.
    ///
    /// - `id`: Identifier to fetch.
    /// - `reply`: One-shot slot receiving the record, `NotFound`, or the store
    ///   failure.
    Fetch {
        id: RecordId,
        reply: oneshot::Sender<Result<Record>>,
    },

    /// Request the worker to shut down gracefully.
    ///
    /// - `response`: One-shot channel for acknowledging that the worker has
    ///   left its loop.
    Shutdown { response: oneshot::Sender<()> },
}
