//! src/storage/mod.rs
//!
//! A small table-storage abstraction: entities addressed by a partition key
//! and a row key, carrying an opaque ETag that changes on every write.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

mod error;
pub use error::StorageError;

mod instrumented;
pub use instrumented::InstrumentedTableClient;

mod memory;
pub use memory::InMemoryTableClient;

mod postgres;
pub use postgres::PgTableClient;

mod retry;
pub use retry::{execute_with_retry, LinearRetry, RequestOptions};

/// Upper bound on the number of operations a single batch may carry.
pub const MAX_BATCH_SIZE: usize = 100;

/// Matches any stored ETag in a batch operation. `TableClient::replace`
/// does not accept it.
pub const ETAG_ANY: &str = "*";

pub type Properties = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageKey {
    pub partition_key: String,
    pub row_key: String,
}

impl StorageKey {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.partition_key, self.row_key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableEntity {
    pub key: StorageKey,
    pub etag: String,
    pub timestamp: DateTime<Utc>,
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyField {
    PartitionKey,
    RowKey,
}

/// Equality filter on one of the two key columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: KeyField,
    pub value: String,
}

impl Filter {
    pub fn partition_key_eq(value: impl Into<String>) -> Self {
        Self {
            field: KeyField::PartitionKey,
            value: value.into(),
        }
    }

    pub fn row_key_eq(value: impl Into<String>) -> Self {
        Self {
            field: KeyField::RowKey,
            value: value.into(),
        }
    }

    pub fn matches(&self, key: &StorageKey) -> bool {
        match self.field {
            KeyField::PartitionKey => key.partition_key == self.value,
            KeyField::RowKey => key.row_key == self.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Delete the row, provided its ETag still matches (or `ETAG_ANY`).
    Delete { key: StorageKey, etag: String },
}

impl BatchOperation {
    pub fn key(&self) -> &StorageKey {
        match self {
            BatchOperation::Delete { key, .. } => key,
        }
    }
}

/// Non-table resources created alongside the tables at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    BlobContainer,
    Queue,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::BlobContainer => "blob_container",
            ResourceKind::Queue => "queue",
        }
    }
}

#[async_trait]
pub trait TableClient: Send + Sync + std::fmt::Debug {
    /// Returns `true` if the table did not exist and was created.
    async fn create_table_if_not_exists(&self, table: &str) -> Result<bool, StorageError>;

    /// Returns `true` if the resource did not exist and was created.
    async fn create_resource_if_not_exists(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<bool, StorageError>;

    async fn retrieve(
        &self,
        table: &str,
        key: &StorageKey,
    ) -> Result<Option<TableEntity>, StorageError>;

    async fn query(&self, table: &str, filter: &Filter) -> Result<Vec<TableEntity>, StorageError>;

    /// Fails with `StorageError::Conflict` if the key already exists.
    async fn insert(
        &self,
        table: &str,
        key: &StorageKey,
        properties: Properties,
    ) -> Result<TableEntity, StorageError>;

    /// Overwrites the row only while its ETag equals `if_match`. The
    /// comparison is exact: `ETAG_ANY` matches no stored row here and fails
    /// with `StorageError::PreconditionFailed`.
    async fn replace(
        &self,
        table: &str,
        key: &StorageKey,
        properties: Properties,
        if_match: &str,
    ) -> Result<TableEntity, StorageError>;

    /// All operations commit or none do.
    async fn execute_batch(
        &self,
        table: &str,
        operations: Vec<BatchOperation>,
    ) -> Result<(), StorageError>;
}

pub(crate) fn new_etag() -> String {
    format!("W/\"{}\"", Uuid::new_v4())
}

/// ETag check for batch operations, where `ETAG_ANY` is allowed.
pub(crate) fn etag_matches(stored: &str, if_match: &str) -> bool {
    if_match == ETAG_ANY || stored == if_match
}

/// A batch must be non-empty, hold at most `MAX_BATCH_SIZE` operations and
/// stay within a single partition.
pub(crate) fn validate_batch(operations: &[BatchOperation]) -> Result<(), StorageError> {
    let first = match operations.first() {
        Some(operation) => operation.key(),
        None => return Err(StorageError::InvalidBatch("a batch must not be empty".into())),
    };

    if operations.len() > MAX_BATCH_SIZE {
        return Err(StorageError::InvalidBatch(format!(
            "a batch holds at most {} operations, got {}",
            MAX_BATCH_SIZE,
            operations.len()
        )));
    }

    if operations
        .iter()
        .any(|operation| operation.key().partition_key != first.partition_key)
    {
        return Err(StorageError::InvalidBatch(
            "all operations in a batch must share one partition key".into(),
        ));
    }

    Ok(())
}
