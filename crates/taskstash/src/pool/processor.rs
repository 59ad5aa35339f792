use crate::{
    cache::RecordCache,
    error::{Error, Result},
    record::{Record, RecordId},
    store::Store,
};
use tokio::sync::oneshot;

/// Handles a single fetch within a worker.
///
/// Reads `id` from the records table, caches the record on success, and
/// sends the outcome through `reply`.
///
/// # Behavior
///
/// - Skips the store read entirely if the caller already gave up (its reply
///   slot is closed, e.g. after a timeout).
/// - A successful read that finds nothing replies [`Error::NotFound`]; a
///   failed read replies [`Error::StoreUnavailable`]. Neither touches the
///   cache.
/// - A caller that disappears while the read is in flight is only logged; the
///   record is still cached.
#[allow(clippy::used_underscore_binding)]
pub async fn handle_fetch_request<S: Store>(
    _worker_id: usize,
    id: RecordId,
    reply: oneshot::Sender<Result<Record>>,
    store: &S,
    cache: &RecordCache,
    table: &str,
) {
    if reply.is_closed() {
        #[cfg(feature = "tracing")]
        tracing::debug!("Worker {_worker_id} dropping fetch for {id}: caller gone");
        return;
    }

    let outcome = fetch_record(store, table, id).await;

    match &outcome {
        Ok(record) => {
            cache.put(record.clone());
            #[cfg(feature = "tracing")]
            tracing::debug!("Worker {_worker_id} fetched record {id}");
        }
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("Worker {_worker_id} could not fetch record {id}: {_e}");
        }
    }

    if reply.send(outcome).is_err() {
        #[cfg(feature = "tracing")]
        tracing::debug!("Worker {_worker_id} failed to reply for {id}: caller gone");
    }
}

async fn fetch_record<S: Store>(store: &S, table: &str, id: RecordId) -> Result<Record> {
    match store.get_item(table, &Record::key_item(id)).await? {
        Some(item) => Ok(Record::from_item(&item)?),
        None => Err(Error::NotFound { id }),
    }
}
