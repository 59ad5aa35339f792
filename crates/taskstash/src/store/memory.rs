use super::{AttributeValue, Item, Store, StoreError};
use crate::{allocator::COUNTER_KEY_ATTRIBUTE, config::ServiceConfig, record::ID_ATTRIBUTE};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Serializable image of one table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub key_attribute: String,
    pub items: Vec<Item>,
}

#[derive(Debug)]
struct Table {
    key_attribute: String,
    items: BTreeMap<AttributeValue, Item>,
}

impl Table {
    fn new(key_attribute: impl Into<String>) -> Self {
        Self {
            key_attribute: key_attribute.into(),
            items: BTreeMap::new(),
        }
    }

    fn key_of(&self, table: &str, item: &Item) -> Result<AttributeValue, StoreError> {
        item.get(&self.key_attribute)
            .cloned()
            .ok_or_else(|| StoreError::MissingKey {
                table: table.to_string(),
                attribute: self.key_attribute.clone(),
            })
    }
}

/// In-process [`Store`] backend.
///
/// Each table is guarded by the same reader/writer lock, so an
/// [`atomic_increment`](Store::atomic_increment) is a single critical section.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the records and counter tables named by `config`.
    pub fn for_config(config: &ServiceConfig) -> Self {
        Self::new()
            .with_table(&config.table_name, ID_ATTRIBUTE)
            .with_table(&config.counter_table, COUNTER_KEY_ATTRIBUTE)
    }

    #[must_use]
    pub fn with_table(self, name: &str, key_attribute: &str) -> Self {
        self.create_table(name, key_attribute);
        self
    }

    /// Declares a table. Declaring an existing table is a no-op.
    pub fn create_table(&self, name: &str, key_attribute: &str) {
        self.tables
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Table::new(key_attribute));
    }

    /// Synchronous form of [`Store::get_item`].
    pub fn get(&self, table: &str, key: &Item) -> Result<Option<Item>, StoreError> {
        let tables = self.tables.read();
        let t = lookup(&tables, table)?;
        let key = t.key_of(table, key)?;
        Ok(t.items.get(&key).cloned())
    }

    /// Synchronous form of [`Store::put_item`].
    pub fn put(&self, table: &str, item: Item) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let t = lookup_mut(&mut tables, table)?;
        let key = t.key_of(table, &item)?;
        t.items.insert(key, item);
        Ok(())
    }

    /// Synchronous form of [`Store::scan`].
    pub fn scan_table(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        let tables = self.tables.read();
        Ok(lookup(&tables, table)?.items.values().cloned().collect())
    }

    /// Synchronous form of [`Store::atomic_increment`].
    pub fn increment(
        &self,
        table: &str,
        key: &Item,
        attribute: &str,
        delta: u64,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write();
        let t = lookup_mut(&mut tables, table)?;
        let key_value = t.key_of(table, key)?;
        let key_attribute = t.key_attribute.clone();

        let item = t.items.entry(key_value.clone()).or_insert_with(|| {
            Item::from([(key_attribute, key_value)])
        });
        let current = match item.get(attribute) {
            Some(value) => value.as_u64(attribute)?,
            None => 0,
        };
        let next = current
            .checked_add(delta)
            .ok_or_else(|| StoreError::Malformed {
                reason: format!("attribute `{attribute}` would overflow"),
            })?;
        item.insert(attribute.to_string(), AttributeValue::N(next.to_string()));
        Ok(next)
    }

    /// Copies every table out for persistence.
    pub fn snapshot(&self) -> BTreeMap<String, TableSnapshot> {
        self.tables
            .read()
            .iter()
            .map(|(name, t)| {
                (
                    name.clone(),
                    TableSnapshot {
                        key_attribute: t.key_attribute.clone(),
                        items: t.items.values().cloned().collect(),
                    },
                )
            })
            .collect()
    }

    /// Rebuilds a store from [`MemoryStore::snapshot`] output.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingKey`] if a snapshot item lacks its table's
    /// key attribute.
    pub fn from_snapshot(tables: BTreeMap<String, TableSnapshot>) -> Result<Self, StoreError> {
        let mut restored = HashMap::with_capacity(tables.len());
        for (name, snapshot) in tables {
            let mut table = Table::new(snapshot.key_attribute);
            for item in snapshot.items {
                let key = table.key_of(&name, &item)?;
                table.items.insert(key, item);
            }
            restored.insert(name, table);
        }
        Ok(Self {
            tables: RwLock::new(restored),
        })
    }
}

fn lookup<'a>(tables: &'a HashMap<String, Table>, table: &str) -> Result<&'a Table, StoreError> {
    tables.get(table).ok_or_else(|| StoreError::TableNotFound {
        table: table.to_string(),
    })
}

fn lookup_mut<'a>(
    tables: &'a mut HashMap<String, Table>,
    table: &str,
) -> Result<&'a mut Table, StoreError> {
    tables.get_mut(table).ok_or_else(|| StoreError::TableNotFound {
        table: table.to_string(),
    })
}

impl Store for MemoryStore {
    async fn get_item(&self, table: &str, key: &Item) -> Result<Option<Item>, StoreError> {
        self.get(table, key)
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), StoreError> {
        self.put(table, item)
    }

    async fn scan(&self, table: &str) -> Result<Vec<Item>, StoreError> {
        self.scan_table(table)
    }

    async fn atomic_increment(
        &self,
        table: &str,
        key: &Item,
        attribute: &str,
        delta: u64,
    ) -> Result<u64, StoreError> {
        self.increment(table, key, attribute, delta)
    }
}
