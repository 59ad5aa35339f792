//! Persistent store adapter.
//!
//! The catalog only depends on the [`Store`] contract: single-item reads and
//! writes, full-table scans, and an atomic "increment and return" primitive
//! used for identifier allocation. Items are attribute maps in the style of
//! DynamoDB, with numbers carried as decimal strings.
//!
//! ## Backends
//!
//! - [`MemoryStore`] - tables held in process memory.
//! - [`FileStore`] - a [`MemoryStore`] persisted to a JSON snapshot after every
//!   mutation.
//!
//! The store handle is created once at startup and shared as `Arc<S>`.

mod file;
mod memory;
#[cfg(test)]
pub(crate) mod testing;

pub use file::*;
pub use memory::*;

use core::future::Future;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single typed attribute value.
///
/// Serializes in DynamoDB's JSON shape (`{"N": "1"}`, `{"S": "text"}`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeValue {
    /// A number, stored in its decimal string form.
    N(String),
    /// A string.
    S(String),
}

impl AttributeValue {
    /// Interprets the value as an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the value is not a numeric
    /// attribute or does not fit in a `u64`.
    pub fn as_u64(&self, name: &str) -> Result<u64, StoreError> {
        match self {
            Self::N(raw) => raw.parse::<u64>().map_err(|e| StoreError::Malformed {
                reason: format!("attribute `{name}` is not an unsigned integer: {e}"),
            }),
            Self::S(_) => Err(StoreError::Malformed {
                reason: format!("attribute `{name}` must be numeric"),
            }),
        }
    }
}

/// An attribute map: the unit of storage.
pub type Item = BTreeMap<String, AttributeValue>;

/// Failure of a backend call.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed table was never declared.
    #[error("table `{table}` does not exist")]
    TableNotFound { table: String },

    /// A key or item lacks the table's key attribute.
    #[error("item is missing key attribute `{attribute}` of table `{table}`")]
    MissingKey { table: String, attribute: String },

    /// A stored item or counter does not have the expected shape.
    #[error("malformed item: {reason}")]
    Malformed { reason: String },

    /// Reading or writing the backing medium failed.
    #[error("I/O error: {context}")]
    Io { context: String },

    /// The backend refused or could not serve the call.
    #[error("backend unavailable: {context}")]
    Unavailable { context: String },
}

impl StoreError {
    pub(crate) fn missing(attribute: &str) -> Self {
        Self::Malformed {
            reason: format!("missing attribute `{attribute}`"),
        }
    }
}

/// Contract of the persistent key-value backend.
///
/// Every table has a single key attribute. `key` arguments are items that
/// carry (at least) that attribute.
pub trait Store: Send + Sync + 'static {
    /// Reads the item addressed by `key`, or `None` if it does not exist.
    fn get_item(
        &self,
        table: &str,
        key: &Item,
    ) -> impl Future<Output = Result<Option<Item>, StoreError>> + Send;

    /// Inserts or replaces `item`.
    fn put_item(
        &self,
        table: &str,
        item: Item,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns every item of `table`, in no particular order.
    fn scan(&self, table: &str) -> impl Future<Output = Result<Vec<Item>, StoreError>> + Send;

    /// Atomically adds `delta` to the numeric `attribute` of the item at `key`
    /// and returns the new value.
    ///
    /// A missing item or attribute counts as `0`. Concurrent calls never
    /// observe the same new value.
    fn atomic_increment(
        &self,
        table: &str,
        key: &Item,
        attribute: &str,
        delta: u64,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}
