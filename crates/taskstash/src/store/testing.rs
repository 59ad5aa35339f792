//! Scripted store double for unit tests.

use super::{Item, MemoryStore, Store, StoreError};
use crate::{config::ServiceConfig, record::Record};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::sync::Semaphore;

/// Wraps a [`MemoryStore`], counting reads and optionally failing or gating
/// them.
///
/// When a gate is installed every `get_item` waits for one permit before
/// touching the store; `reads_started` is bumped before waiting so tests can
/// observe how many workers are parked on the gate.
#[derive(Debug)]
pub(crate) struct ScriptedStore {
    inner: MemoryStore,
    gate: Option<Arc<Semaphore>>,
    reads_started: AtomicUsize,
    reads: AtomicUsize,
    scans: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_increments: AtomicBool,
}

impl ScriptedStore {
    pub(crate) fn new(config: &ServiceConfig) -> Self {
        Self {
            inner: MemoryStore::for_config(config),
            gate: None,
            reads_started: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            scans: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_increments: AtomicBool::new(false),
        }
    }

    pub(crate) fn gated(config: &ServiceConfig, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(config)
        }
    }

    /// Writes records directly, bypassing the service and the counter.
    pub(crate) fn seed(&self, table: &str, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.inner.put(table, record.to_item()).unwrap();
        }
    }

    pub(crate) fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    pub(crate) fn reads_started(&self) -> usize {
        self.reads_started.load(Ordering::SeqCst)
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }
}

fn unavailable(op: &str) -> StoreError {
    StoreError::Unavailable {
        context: format!("scripted {op} failure"),
    }
}

impl Store for ScriptedStore {
    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>, StoreError> {
        self.reads_started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|_| unavailable("gate"))?;
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable("read"));
        }
        self.inner.get(table, key)
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable("write"));
        }
        self.inner.put(table, item)
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable("scan"));
        }
        self.inner.scan_table(table)
    }

    async fn atomic_increment(
        &self,
        table: &str,
        key: &Item,
        attribute: &str,
        delta: u64,
    ) -> Result<u64, StoreError> {
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(unavailable("increment"));
        }
        self.inner.increment(table, key, attribute, delta)
    }
}
