//! In-memory record cache.
//!
//! [`RecordCache`] is the only state written by more than one actor: fetch
//! workers insert resolved records while the service inserts created and
//! listed ones. All access goes through a [`parking_lot::RwLock`] that is held
//! for the map operation only and never across an `.await`.
//!
//! The cache is unbounded and has no expiry. It is an accelerator in front of
//! the store, not a source of truth, and entries may be stale relative to
//! writes made by other processes.

use crate::record::{Record, RecordId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hit/miss counters and size of a [`RecordCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
pub struct RecordCache {
    entries: RwLock<HashMap<RecordId, Record>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the cached record, if any.
    pub fn get(&self, id: RecordId) -> Option<Record> {
        let found = self.entries.read().get(&id).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Inserts or replaces the entry for `record.id`.
    ///
    /// The sentinel record is never cached.
    pub fn put(&self, record: Record) {
        if record.is_sentinel() {
            #[cfg(feature = "tracing")]
            tracing::warn!("Refusing to cache the sentinel record");
            return;
        }
        self.entries.write().insert(record.id, record);
    }

    /// Inserts a batch of records under a single write lock.
    pub fn extend(&self, records: impl IntoIterator<Item = Record>) {
        let mut entries = self.entries.write();
        for record in records {
            if !record.is_sentinel() {
                entries.insert(record.id, record);
            }
        }
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.entries.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread::scope};

    fn record(id: u64) -> Record {
        Record::new(RecordId::new(id), format!("title {id}"), format!("desc {id}"))
    }

    #[test]
    fn put_then_get() {
        let cache = RecordCache::new();
        assert!(cache.get(RecordId::new(1)).is_none());

        cache.put(record(1));
        assert_eq!(cache.get(RecordId::new(1)), Some(record(1)));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn put_replaces_with_latest_snapshot() {
        let cache = RecordCache::new();
        cache.put(record(1));
        cache.put(Record::new(RecordId::new(1), "renamed", ""));
        assert_eq!(cache.get(RecordId::new(1)).unwrap().title, "renamed");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sentinel_is_never_cached() {
        let cache = RecordCache::new();
        cache.put(Record::sentinel());
        cache.extend([Record::sentinel(), record(2)]);
        assert!(!cache.contains(RecordId::SENTINEL));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_writers_and_readers() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 512;

        let cache = Arc::new(RecordCache::new());
        scope(|s| {
            for t in 0..THREADS {
                let cache = Arc::clone(&cache);
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        let id = t * PER_THREAD + i + 1;
                        cache.put(record(id));
                        assert_eq!(cache.get(RecordId::new(id)), Some(record(id)));
                    }
                });
            }
        });

        assert_eq!(cache.len(), (THREADS * PER_THREAD) as usize);
        assert_eq!(cache.stats().hits, THREADS * PER_THREAD);
    }
}
