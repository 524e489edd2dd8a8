//! src/store.rs
use crate::domain::{DecodeError, MailingList, MAILING_LIST_ROW_KEY};
use crate::storage::{
    execute_with_retry, BatchOperation, Filter, RequestOptions, StorageError, StorageKey,
    TableClient, MAX_BATCH_SIZE,
};
use crate::telemetry::error_chain_fmt;
use std::sync::Arc;

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("No mailing list found for: {0}")]
    NotFound(String),
    #[error("A mailing list named {0} already exists.")]
    Conflict(String),
    #[error("Mailing list {0} was modified after it was read.")]
    VersionConflict(String),
    #[error("Timeout error, try again.")]
    Timeout(#[source] StorageError),
    #[error("Stored row {key} is not a valid mailing list")]
    Corrupt {
        key: StorageKey,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    Storage(StorageError),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(key) => StoreError::NotFound(key.partition_key),
            StorageError::Conflict(key) => StoreError::Conflict(key.partition_key),
            StorageError::PreconditionFailed(key) => StoreError::VersionConflict(key.partition_key),
            e @ StorageError::Timeout { .. } => StoreError::Timeout(e),
            e => StoreError::Storage(e),
        }
    }
}

/// Mailing-list rows of one table. Built once at startup and shared by
/// every request.
#[derive(Debug, Clone)]
pub struct MailingListStore {
    client: Arc<dyn TableClient>,
    table: String,
    list_options: RequestOptions,
}

impl MailingListStore {
    pub fn new(
        client: Arc<dyn TableClient>,
        table: impl Into<String>,
        list_options: RequestOptions,
    ) -> Self {
        Self {
            client,
            table: table.into(),
            list_options,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    #[tracing::instrument(name = "Find mailing list row", skip(self))]
    pub async fn find_one(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<MailingList, StoreError> {
        let key = StorageKey::new(partition_key, row_key);
        let entity = self
            .client
            .retrieve(&self.table, &key)
            .await?
            .ok_or_else(|| StoreError::NotFound(partition_key.to_string()))?;

        decode(entity.key.clone(), MailingList::from_entity(entity))
    }

    pub async fn find(&self, list_name: &str) -> Result<MailingList, StoreError> {
        self.find_one(list_name, MAILING_LIST_ROW_KEY).await
    }

    /// Scans for rows matching `filter`, bounded by the store's list options.
    /// An attempt that exceeds the execution ceiling is retried at a fixed
    /// interval; once the retries are spent the caller gets
    /// `StoreError::Timeout`.
    #[tracing::instrument(name = "List mailing list rows", skip(self))]
    pub async fn list_all(&self, filter: &Filter) -> Result<Vec<MailingList>, StoreError> {
        let client = &self.client;
        let table = self.table.as_str();
        let rows = execute_with_retry(&self.list_options, move || client.query(table, filter))
            .await
            .map_err(|e| match e {
                e @ StorageError::Timeout { .. } | e @ StorageError::Unavailable(_) => {
                    StoreError::Timeout(e)
                }
                e => StoreError::from(e),
            })?;

        rows.into_iter()
            .map(|entity| decode(entity.key.clone(), MailingList::from_entity(entity)))
            .collect()
    }

    pub async fn list_mailing_lists(&self) -> Result<Vec<MailingList>, StoreError> {
        self.list_all(&Filter::row_key_eq(MAILING_LIST_ROW_KEY)).await
    }

    /// Fails with `StoreError::Conflict` if the list already exists; the
    /// stored row is left untouched in that case.
    #[tracing::instrument(
        name = "Insert mailing list",
        skip(self, list),
        fields(list_name = %list.list_name())
    )]
    pub async fn insert(&self, list: &MailingList) -> Result<MailingList, StoreError> {
        let entity = self
            .client
            .insert(&self.table, list.key(), list.to_properties())
            .await?;

        Ok(list.clone().with_version_tag(entity.etag))
    }

    /// Writes `list` only if the stored row still carries
    /// `expected_version_tag`. The returned record holds the new tag.
    #[tracing::instrument(
        name = "Replace mailing list",
        skip(self, list),
        fields(list_name = %list.list_name())
    )]
    pub async fn replace(
        &self,
        list: &MailingList,
        expected_version_tag: &str,
    ) -> Result<MailingList, StoreError> {
        let entity = self
            .client
            .replace(
                &self.table,
                list.key(),
                list.to_properties(),
                expected_version_tag,
            )
            .await?;

        Ok(list.clone().with_version_tag(entity.etag))
    }

    /// Deletes every row in the partition, the mailing-list row and all of its
    /// subscriber rows alike, in batches of at most `MAX_BATCH_SIZE`.
    ///
    /// Batches run one after another. A failing batch stops the deletion;
    /// batches already committed stay deleted, and running the deletion again
    /// picks up whatever is left.
    #[tracing::instrument(name = "Delete mailing list partition", skip(self))]
    pub async fn delete_partition(&self, partition_key: &str) -> Result<usize, StoreError> {
        let rows = self
            .client
            .query(&self.table, &Filter::partition_key_eq(partition_key))
            .await?;

        let mut deleted = 0;
        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        for row in rows {
            batch.push(BatchOperation::Delete {
                key: row.key,
                etag: row.etag,
            });

            if batch.len() == MAX_BATCH_SIZE {
                deleted += self.flush(std::mem::take(&mut batch)).await?;
            }
        }

        // Stragglers in a final, partial batch.
        if !batch.is_empty() {
            deleted += self.flush(batch).await?;
        }

        tracing::info!(deleted, "Deleted partition {}", partition_key);
        Ok(deleted)
    }

    async fn flush(&self, batch: Vec<BatchOperation>) -> Result<usize, StoreError> {
        let size = batch.len();
        self.client
            .execute_batch(&self.table, batch)
            .await
            .map_err(|e| {
                tracing::error!(error.cause_chain = ?e, "Failed to execute delete batch");
                e
            })?;
        Ok(size)
    }
}

fn decode(
    key: StorageKey,
    result: Result<MailingList, DecodeError>,
) -> Result<MailingList, StoreError> {
    result.map_err(|source| StoreError::Corrupt { key, source })
}
