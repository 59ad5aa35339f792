use super::{Item, MemoryStore, Store, StoreError, TableSnapshot};
use crate::config::ServiceConfig;
use crate::{allocator::COUNTER_KEY_ATTRIBUTE, record::ID_ATTRIBUTE};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{io::AsyncWriteExt, sync::Mutex};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    region: String,
    tables: BTreeMap<String, TableSnapshot>,
}

/// A [`MemoryStore`] persisted to a JSON snapshot file.
///
/// Reads are served from memory. Every mutation is first applied to a staged
/// copy of the tables, which is written to a sibling temp file, synced, and
/// renamed over the original. Only then does it reach the in-memory tables, so
/// a mutation that fails to persist is never visible to readers and a
/// successful `put_item` or `atomic_increment` survives a restart.
/// Mutations are serialized by `write_lock` so snapshots land in order.
#[derive(Debug)]
pub struct FileStore {
    inner: MemoryStore,
    path: PathBuf,
    region: String,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (or creates) the snapshot at `path` and declares the tables
    /// named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read and
    /// [`StoreError::Malformed`] if it is not a valid snapshot.
    pub async fn open(
        path: impl AsRef<Path>,
        region: impl Into<String>,
        config: &ServiceConfig,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let region = region.into();

        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice::<Snapshot>(&bytes).map_err(|e| StoreError::Malformed {
                    reason: format!("invalid snapshot {}: {e}", path.display()),
                })?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Snapshot::default(),
            Err(e) => {
                return Err(StoreError::Io {
                    context: format!("reading {}: {e}", path.display()),
                });
            }
        };

        #[cfg(feature = "tracing")]
        {
            if !snapshot.region.is_empty() && snapshot.region != region {
                tracing::warn!(
                    "Snapshot {} was written for region {}, opening as {}",
                    path.display(),
                    snapshot.region,
                    region
                );
            }
        }

        let inner = MemoryStore::from_snapshot(snapshot.tables)?
            .with_table(&config.table_name, ID_ATTRIBUTE)
            .with_table(&config.counter_table, COUNTER_KEY_ATTRIBUTE);

        Ok(Self {
            inner,
            path,
            region,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Copy of the current tables to apply a pending mutation to.
    fn stage(&self) -> Result<MemoryStore, StoreError> {
        MemoryStore::from_snapshot(self.inner.snapshot())
    }

    async fn persist(&self, staged: &MemoryStore) -> Result<(), StoreError> {
        let snapshot = Snapshot {
            region: self.region.clone(),
            tables: staged.snapshot(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Io {
            context: format!("encoding snapshot: {e}"),
        })?;

        let tmp = self.path.with_extension("tmp");
        let io_error = |e: std::io::Error| StoreError::Io {
            context: format!("writing {}: {e}", tmp.display()),
        };
        {
            let mut file = tokio::fs::File::create(&tmp).await.map_err(io_error)?;
            file.write_all(&bytes).await.map_err(io_error)?;
            file.sync_all().await.map_err(io_error)?;
        }
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io {
                context: format!("renaming {} to {}: {e}", tmp.display(), self.path.display()),
            })
    }
}

impl Store for FileStore {
    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>, StoreError> {
        self.inner.get(table, key)
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let staged = self.stage()?;
        staged.put(table, item.clone())?;
        self.persist(&staged).await?;
        self.inner.put(table, item)
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        self.inner.scan_table(table)
    }

    async fn atomic_increment(
        &self,
        table: &str,
        key: &Item,
        attribute: &str,
        delta: u64,
    ) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let staged = self.stage()?;
        staged.increment(table, key, attribute, delta)?;
        self.persist(&staged).await?;
        self.inner.increment(table, key, attribute, delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allocator::IdAllocator,
        record::{Record, RecordId},
    };
    use std::sync::Arc;

    fn snapshot_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "taskstash-{}-{}.json",
            std::process::id(),
            name
        ))
    }

    #[tokio::test]
    async fn reopen_restores_records_and_counter() {
        let path = snapshot_path("reopen");
        let _ = std::fs::remove_file(&path);
        let config = ServiceConfig::default();

        {
            let store = Arc::new(FileStore::open(&path, "local", &config).await.unwrap());
            let allocator = IdAllocator::new(Arc::clone(&store), &config.counter_table);
            for title in ["first", "second"] {
                let id = allocator.allocate_next_id().await.unwrap();
                let record = Record::new(id, title, "");
                store.put_item(&config.table_name, record.to_item()).await.unwrap();
            }
        }

        let store = Arc::new(FileStore::open(&path, "local", &config).await.unwrap());
        let items = store.scan(&config.table_name).await.unwrap();
        assert_eq!(items.len(), 2);

        let allocator = IdAllocator::new(Arc::clone(&store), &config.counter_table);
        assert_eq!(allocator.allocate_next_id().await.unwrap(), RecordId::new(3));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn failed_persist_leaves_no_trace() {
        let dir = std::env::temp_dir().join(format!("taskstash-{}-unwritable", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let config = ServiceConfig::default();
        let store = FileStore::open(dir.join("data.json"), "local", &config)
            .await
            .unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        let record = Record::new(RecordId::new(1), "ghost", "");
        let err = store
            .put_item(&config.table_name, record.to_item())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(store.scan(&config.table_name).await.unwrap().is_empty());
        assert_eq!(
            store
                .get_item(&config.table_name, &Record::key_item(RecordId::new(1)))
                .await
                .unwrap(),
            None
        );

        let store = Arc::new(store);
        let allocator = IdAllocator::new(Arc::clone(&store), &config.counter_table);
        assert!(allocator.allocate_next_id().await.is_err());

        std::fs::create_dir_all(&dir).unwrap();
        assert_eq!(allocator.allocate_next_id().await.unwrap(), RecordId::new(1));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_rejected() {
        let path = snapshot_path("corrupt");
        std::fs::write(&path, b"not json").unwrap();
        let err = FileStore::open(&path, "local", &ServiceConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let path = snapshot_path("missing");
        let _ = std::fs::remove_file(&path);
        let store = FileStore::open(&path, "eu-west-1", &ServiceConfig::default())
            .await
            .unwrap();
        assert_eq!(store.region(), "eu-west-1");
        assert!(store.scan("tasks").await.unwrap().is_empty());
        assert!(!path.exists());
    }
}
