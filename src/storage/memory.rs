//! src/storage/memory.rs
use super::{
    etag_matches, new_etag, validate_batch, BatchOperation, Filter, Properties, ResourceKind,
    StorageError, StorageKey, TableClient, TableEntity,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Table = BTreeMap<StorageKey, TableEntity>;

/// Process-local backend. Every call runs under a single lock, so a
/// conditional replace is a true compare-and-swap.
#[derive(Debug, Default)]
pub struct InMemoryTableClient {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    resources: BTreeSet<(ResourceKind, String)>,
}

impl State {
    fn table(&self, name: &str) -> Result<&Table, StorageError> {
        self.tables
            .get(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, StorageError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }
}

impl InMemoryTableClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_resource(&self, kind: ResourceKind, name: &str) -> bool {
        self.state().resources.contains(&(kind, name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.state().tables.contains_key(name)
    }
}

#[async_trait]
impl TableClient for InMemoryTableClient {
    async fn create_table_if_not_exists(&self, table: &str) -> Result<bool, StorageError> {
        let mut state = self.state();
        if state.tables.contains_key(table) {
            return Ok(false);
        }
        state.tables.insert(table.to_string(), Table::new());
        Ok(true)
    }

    async fn create_resource_if_not_exists(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<bool, StorageError> {
        Ok(self.state().resources.insert((kind, name.to_string())))
    }

    async fn retrieve(
        &self,
        table: &str,
        key: &StorageKey,
    ) -> Result<Option<TableEntity>, StorageError> {
        let state = self.state();
        Ok(state.table(table)?.get(key).cloned())
    }

    async fn query(&self, table: &str, filter: &Filter) -> Result<Vec<TableEntity>, StorageError> {
        let state = self.state();
        Ok(state
            .table(table)?
            .values()
            .filter(|entity| filter.matches(&entity.key))
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        table: &str,
        key: &StorageKey,
        properties: Properties,
    ) -> Result<TableEntity, StorageError> {
        let mut state = self.state();
        let rows = state.table_mut(table)?;
        if rows.contains_key(key) {
            return Err(StorageError::Conflict(key.clone()));
        }

        let entity = TableEntity {
            key: key.clone(),
            etag: new_etag(),
            timestamp: Utc::now(),
            properties,
        };
        rows.insert(key.clone(), entity.clone());
        Ok(entity)
    }

    async fn replace(
        &self,
        table: &str,
        key: &StorageKey,
        properties: Properties,
        if_match: &str,
    ) -> Result<TableEntity, StorageError> {
        let mut state = self.state();
        let stored = state
            .table_mut(table)?
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound(key.clone()))?;

        if stored.etag != if_match {
            return Err(StorageError::PreconditionFailed(key.clone()));
        }

        stored.etag = new_etag();
        stored.timestamp = Utc::now();
        stored.properties = properties;
        Ok(stored.clone())
    }

    async fn execute_batch(
        &self,
        table: &str,
        operations: Vec<BatchOperation>,
    ) -> Result<(), StorageError> {
        validate_batch(&operations)?;

        let mut state = self.state();
        let rows = state.table_mut(table)?;

        // Check every operation before applying any of them.
        for operation in &operations {
            match operation {
                BatchOperation::Delete { key, etag } => match rows.get(key) {
                    None => return Err(StorageError::NotFound(key.clone())),
                    Some(stored) if !etag_matches(&stored.etag, etag) => {
                        return Err(StorageError::PreconditionFailed(key.clone()))
                    }
                    Some(_) => {}
                },
            }
        }

        for operation in operations {
            match operation {
                BatchOperation::Delete { key, .. } => {
                    rows.remove(&key);
                }
            }
        }

        Ok(())
    }
}
