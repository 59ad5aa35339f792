use super::config::ServerConfig;
use taskstash::{FileStore, Item, MemoryStore, Store, StoreError};

/// Store selected at startup: a JSON snapshot when `DATA_FILE` is set,
/// process memory otherwise.
#[derive(Debug)]
pub enum Backend {
    Memory(MemoryStore),
    File(FileStore),
}

impl Backend {
    pub async fn open(config: &ServerConfig) -> Result<Self, StoreError> {
        match &config.data_file {
            Some(path) => {
                let store = FileStore::open(path, config.region.clone(), &config.service).await?;
                Ok(Self::File(store))
            }
            None => Ok(Self::Memory(MemoryStore::for_config(&config.service))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Memory(_) => "memory".to_string(),
            Self::File(store) => format!("file {}", store.path().display()),
        }
    }
}

impl Store for Backend {
    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>, StoreError> {
        match self {
            Self::Memory(store) => store.get_item(table, key).await,
            Self::File(store) => store.get_item(table, key).await,
        }
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.put_item(table, item).await,
            Self::File(store) => store.put_item(table, item).await,
        }
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        match self {
            Self::Memory(store) => store.scan(table).await,
            Self::File(store) => store.scan(table).await,
        }
    }

    async fn atomic_increment(
        &self,
        table: &str,
        key: &Item,
        attribute: &str,
        delta: u64,
    ) -> Result<u64, StoreError> {
        match self {
            Self::Memory(store) => store.atomic_increment(table, key, attribute, delta).await,
            Self::File(store) => {
                store
                    .atomic_increment(table, key, attribute, delta)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use taskstash::{RecordId, RecordService, ServiceConfig};

    fn server_config(data_file: Option<std::path::PathBuf>) -> ServerConfig {
        ServerConfig {
            region: "local".to_string(),
            data_file,
            server_addr: "127.0.0.1:0".to_string(),
            service: ServiceConfig::default(),
        }
    }

    #[tokio::test]
    async fn memory_backend_without_data_file() {
        let backend = Backend::open(&server_config(None)).await.unwrap();
        assert!(matches!(backend, Backend::Memory(_)));
    }

    #[tokio::test]
    async fn file_backend_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!(
            "taskstash-backend-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let config = server_config(Some(path.clone()));

        let backend = Arc::new(Backend::open(&config).await.unwrap());
        assert!(matches!(*backend, Backend::File(_)));
        let service = RecordService::new(config.service.clone(), backend);
        let created = service.create("Buy milk", "2%").await.unwrap();
        service.shutdown().await.unwrap();

        let reopened = Arc::new(Backend::open(&config).await.unwrap());
        let service = RecordService::new(config.service.clone(), reopened);
        assert_eq!(service.get(RecordId::new(1)).await.unwrap(), created);
        assert_eq!(service.create("Walk dog", "").await.unwrap().id, RecordId::new(2));
        service.shutdown().await.unwrap();

        let _ = std::fs::remove_file(&path);
    }
}
