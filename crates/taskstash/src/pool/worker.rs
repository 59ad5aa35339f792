use super::{processor::handle_fetch_request, request::WorkRequest};
use crate::{cache::RecordCache, store::Store};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Receiving half of the request queue, shared by every worker.
pub type SharedQueue = Arc<Mutex<mpsc::Receiver<WorkRequest>>>;

/// Worker task responsible for processing [`WorkRequest`] messages.
///
/// All workers pull from the same bounded queue. The receiver lock is held
/// only while waiting for the next message, so at most one idle worker waits
/// on the channel at a time while the others wait for their turn; a busy
/// worker never holds it.
///
/// This function is designed to be spawned as a Tokio task and runs until it
/// receives [`WorkRequest::Shutdown`] or the queue is closed.
///
/// # Arguments
///
/// - `worker_id`: Numeric identifier for this worker (used for logs/tracing).
/// - `queue`: Shared receiver of the request queue.
/// - `store`: Backend the worker reads from.
/// - `cache`: Cache populated with every successfully fetched record.
/// - `table`: Records table name.
pub async fn worker_loop<S: Store>(
    worker_id: usize,
    queue: SharedQueue,
    store: Arc<S>,
    cache: Arc<RecordCache>,
    table: Arc<str>,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    loop {
        let next = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };
        let Some(work) = next else {
            #[cfg(feature = "tracing")]
            tracing::debug!("Worker {worker_id} queue closed");
            break;
        };

        match work {
            WorkRequest::Fetch { id, reply } => {
                handle_fetch_request(worker_id, id, reply, store.as_ref(), &cache, &table).await;
            }
            WorkRequest::Shutdown { response } => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}
