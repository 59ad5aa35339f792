use crate::{
    error::Result,
    record::RecordId,
    store::{AttributeValue, Item, Store, StoreError},
};
use std::sync::Arc;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Key attribute of the counter table.
pub const COUNTER_KEY_ATTRIBUTE: &str = "CounterName";
/// Name of the counter backing record identifiers.
pub const COUNTER_NAME: &str = "TaskID";
/// Numeric attribute holding the last issued identifier.
pub const CURRENT_VALUE_ATTRIBUTE: &str = "CurrentValue";

/// Issues record identifiers from a counter held in the store.
///
/// Every call performs one [`Store::atomic_increment`] by `1`, so concurrent
/// callers (in this process or any other sharing the store) always receive
/// distinct, increasing identifiers. No state is kept locally.
///
/// An identifier whose record is never written is simply skipped; ids are
/// unique and increasing, not contiguous.
#[derive(Debug)]
pub struct IdAllocator<S> {
    store: Arc<S>,
    table: String,
}

impl<S: Store> IdAllocator<S> {
    pub fn new(store: Arc<S>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    /// Allocates the next identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`](crate::Error::StoreUnavailable) if
    /// the increment fails, or if the counter yields `0` (the sentinel).
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self), fields(table = %self.table)))]
    pub async fn allocate_next_id(&self) -> Result<RecordId> {
        let next = self
            .store
            .atomic_increment(&self.table, &counter_key(), CURRENT_VALUE_ATTRIBUTE, 1)
            .await?;

        if next == 0 {
            return Err(StoreError::Malformed {
                reason: format!("counter `{COUNTER_NAME}` produced the sentinel id"),
            }
            .into());
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("Allocated id {next}");
        Ok(RecordId::new(next))
    }
}

fn counter_key() -> Item {
    Item::from([(
        COUNTER_KEY_ATTRIBUTE.to_string(),
        AttributeValue::S(COUNTER_NAME.to_string()),
    )])
}
