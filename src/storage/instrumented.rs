//! src/storage/instrumented.rs
use super::{
    BatchOperation, Filter, Properties, ResourceKind, StorageError, StorageKey, TableClient,
    TableEntity,
};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Wraps a backend to record the size of every batch it receives and to
/// inject batch failures or query latency. The server never builds one; it
/// exists for tests that need to observe or disturb the storage calls.
#[derive(Debug, Default)]
pub struct InstrumentedTableClient<C> {
    inner: C,
    hooks: Mutex<Hooks>,
}

#[derive(Debug, Default)]
struct Hooks {
    batch_calls: Vec<usize>,
    failing_batch_call: Option<usize>,
    query_delay: Duration,
}

impl<C: TableClient> InstrumentedTableClient<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            hooks: Mutex::default(),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn hooks(&self) -> MutexGuard<'_, Hooks> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sizes of every batch submitted so far, in submission order.
    pub fn batch_calls(&self) -> Vec<usize> {
        self.hooks().batch_calls.clone()
    }

    /// Makes the `n`th batch call (zero based) fail without applying anything.
    pub fn fail_batch_call(&self, n: usize) {
        self.hooks().failing_batch_call = Some(n);
    }

    /// Delays every query by `delay` before it reaches the backend.
    pub fn set_query_delay(&self, delay: Duration) {
        self.hooks().query_delay = delay;
    }
}

#[async_trait]
impl<C: TableClient> TableClient for InstrumentedTableClient<C> {
    async fn create_table_if_not_exists(&self, table: &str) -> Result<bool, StorageError> {
        self.inner.create_table_if_not_exists(table).await
    }

    async fn create_resource_if_not_exists(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<bool, StorageError> {
        self.inner.create_resource_if_not_exists(kind, name).await
    }

    async fn retrieve(
        &self,
        table: &str,
        key: &StorageKey,
    ) -> Result<Option<TableEntity>, StorageError> {
        self.inner.retrieve(table, key).await
    }

    async fn query(&self, table: &str, filter: &Filter) -> Result<Vec<TableEntity>, StorageError> {
        let delay = self.hooks().query_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.inner.query(table, filter).await
    }

    async fn insert(
        &self,
        table: &str,
        key: &StorageKey,
        properties: Properties,
    ) -> Result<TableEntity, StorageError> {
        self.inner.insert(table, key, properties).await
    }

    async fn replace(
        &self,
        table: &str,
        key: &StorageKey,
        properties: Properties,
        if_match: &str,
    ) -> Result<TableEntity, StorageError> {
        self.inner.replace(table, key, properties, if_match).await
    }

    async fn execute_batch(
        &self,
        table: &str,
        operations: Vec<BatchOperation>,
    ) -> Result<(), StorageError> {
        let (call, fail) = {
            let mut hooks = self.hooks();
            let call = hooks.batch_calls.len();
            hooks.batch_calls.push(operations.len());
            (call, hooks.failing_batch_call == Some(call))
        };

        if fail {
            return Err(StorageError::Unavailable(anyhow::anyhow!(
                "batch call {} was configured to fail",
                call
            )));
        }
        self.inner.execute_batch(table, operations).await
    }
}
