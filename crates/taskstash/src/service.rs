//! Record catalog service.
//!
//! This module defines [`RecordService`], the single entry point used by
//! frontends. It ties together the store, the [`RecordCache`], the
//! [`IdAllocator`] and the fetch [`WorkerPool`].
//!
//! ## Responsibilities
//!
//! - Serve reads from the cache, falling back to the worker pool on a miss.
//! - Refresh the cache from full scans on `list_all`.
//! - Allocate identifiers and write new records through to the store.
//! - Shut the worker pool down gracefully.

use crate::{
    allocator::IdAllocator,
    cache::{CacheStats, RecordCache},
    config::ServiceConfig,
    error::{Error, Result},
    pool::WorkerPool,
    record::{NewRecord, Record, RecordId},
    store::Store,
};
use std::sync::Arc;

/// Read-through record catalog.
///
/// Cloning is cheap; clones share the cache, the allocator and the worker
/// pool. Must be created inside a Tokio runtime because construction spawns
/// the fetch workers.
pub struct RecordService<S> {
    config: Arc<ServiceConfig>,
    store: Arc<S>,
    cache: Arc<RecordCache>,
    allocator: Arc<IdAllocator<S>>,
    worker_pool: Arc<WorkerPool>,
}

impl<S> Clone for RecordService<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            allocator: Arc::clone(&self.allocator),
            worker_pool: Arc::clone(&self.worker_pool),
        }
    }
}

impl<S: Store> RecordService<S> {
    /// Creates the service and spawns its fetch workers.
    ///
    /// # Panics
    ///
    /// Panics outside a Tokio runtime or when `config` asks for zero workers
    /// or a zero-capacity queue.
    pub fn new(config: ServiceConfig, store: Arc<S>) -> Self {
        let cache = Arc::new(RecordCache::new());
        let allocator = IdAllocator::new(Arc::clone(&store), config.counter_table.clone());
        let worker_pool = WorkerPool::spawn(&config, Arc::clone(&store), Arc::clone(&cache));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Record service started with {} workers, queue capacity {}",
            config.num_workers,
            config.queue_capacity
        );

        Self {
            config: Arc::new(config),
            store,
            cache,
            allocator: Arc::new(allocator),
            worker_pool: Arc::new(worker_pool),
        }
    }

    /// Returns every stored record sorted by ascending id, refreshing the
    /// cache with each of them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the scan fails or a stored item
    /// cannot be decoded.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn list_all(&self) -> Result<Vec<Record>> {
        let items = self.store.scan(&self.config.table_name).await?;
        let mut records = items
            .iter()
            .map(Record::from_item)
            .collect::<core::result::Result<Vec<_>, _>>()?;

        self.cache.extend(records.iter().cloned());
        records.sort_unstable_by_key(|r| r.id);

        #[cfg(feature = "tracing")]
        tracing::debug!("Listed {} records", records.len());
        Ok(records)
    }

    /// Returns the record for `id`, from the cache when possible.
    ///
    /// A miss is handed to the worker pool and awaited, bounded by the
    /// configured fetch timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the store holds no such record (including the
    ///   sentinel id `0`, which is never looked up).
    /// - [`Error::StoreUnavailable`] if the store read failed.
    /// - [`Error::Timeout`], [`Error::ServiceShutdown`] or
    ///   [`Error::ChannelError`] from the worker pool.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(id = %id)))]
    pub async fn get(&self, id: RecordId) -> Result<Record> {
        if id.is_sentinel() {
            return Err(Error::NotFound { id });
        }

        if let Some(record) = self.cache.get(id) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Cache hit");
            return Ok(record);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Cache miss, requesting worker");
        self.worker_pool.fetch(id, self.config.fetch_timeout).await
    }

    /// Like [`get`](Self::get), but answers "not found" with the sentinel
    /// record instead of an error.
    ///
    /// # Errors
    ///
    /// Every error of [`get`](Self::get) except [`Error::NotFound`].
    pub async fn get_or_sentinel(&self, id: RecordId) -> Result<Record> {
        match self.get(id).await {
            Err(Error::NotFound { .. }) => Ok(Record::sentinel()),
            other => other,
        }
    }

    /// Creates a record with a freshly allocated id, writes it to the store
    /// and caches it.
    ///
    /// An id allocated for a write that then fails is not reused.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the payload is rejected (nothing is
    ///   allocated).
    /// - [`Error::StoreUnavailable`] if allocation or the write fails.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub async fn create(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Record> {
        let payload = NewRecord::new(title, description);
        payload.validate()?;

        let id = self.allocator.allocate_next_id().await?;
        let record = payload.into_record(id);
        self.store
            .put_item(&self.config.table_name, record.to_item())
            .await?;
        self.cache.put(record.clone());

        #[cfg(feature = "tracing")]
        tracing::info!("Created record {}", record.id);
        Ok(record)
    }

    /// Stops the worker pool: new misses are refused, in-flight ones drain,
    /// then every worker exits. Cache hits and creates keep working.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelError`] if the request queue closed early.
    pub async fn shutdown(&self) -> Result<()> {
        self.worker_pool.shutdown().await
    }

    pub fn is_shutting_down(&self) -> bool {
        self.worker_pool.is_shutting_down()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn worker_pool(&self) -> &WorkerPool {
        &self.worker_pool
    }
}
