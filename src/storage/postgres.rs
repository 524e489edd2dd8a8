//! src/storage/postgres.rs
use super::{
    etag_matches, new_etag, validate_batch, BatchOperation, Filter, KeyField, Properties,
    ResourceKind, StorageError, StorageKey, TableClient, TableEntity,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres};

/// Table storage on top of Postgres. Entities of every logical table share
/// `table_entities`, with their properties kept as JSONB.
#[derive(Debug, Clone)]
pub struct PgTableClient {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct EntityRow {
    partition_key: String,
    row_key: String,
    etag: String,
    updated_at: DateTime<Utc>,
    properties: Json<Properties>,
}

impl From<EntityRow> for TableEntity {
    fn from(row: EntityRow) -> Self {
        Self {
            key: StorageKey::new(row.partition_key, row.row_key),
            etag: row.etag,
            timestamp: row.updated_at,
            properties: row.properties.0,
        }
    }
}

impl PgTableClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_table(&self, table: &str) -> Result<(), StorageError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM storage_tables WHERE table_name = $1)")
                .bind(table)
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Ok(())
        } else {
            Err(StorageError::TableNotFound(table.to_string()))
        }
    }

    async fn current_etag<'e, E>(
        executor: E,
        table: &str,
        key: &StorageKey,
    ) -> Result<Option<String>, StorageError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let etag = sqlx::query_scalar(
            r#"
            SELECT etag FROM table_entities
            WHERE table_name = $1 AND partition_key = $2 AND row_key = $3
            "#,
        )
        .bind(table)
        .bind(&key.partition_key)
        .bind(&key.row_key)
        .fetch_optional(executor)
        .await?;

        Ok(etag)
    }
}

#[async_trait]
impl TableClient for PgTableClient {
    #[tracing::instrument(name = "Create table if missing", skip(self))]
    async fn create_table_if_not_exists(&self, table: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO storage_tables (table_name, created_at)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(table)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(name = "Create resource if missing", skip(self))]
    async fn create_resource_if_not_exists(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO storage_resources (kind, name, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(kind.as_str())
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn retrieve(
        &self,
        table: &str,
        key: &StorageKey,
    ) -> Result<Option<TableEntity>, StorageError> {
        self.ensure_table(table).await?;

        let row: Option<EntityRow> = sqlx::query_as(
            r#"
            SELECT partition_key, row_key, etag, updated_at, properties
            FROM table_entities
            WHERE table_name = $1 AND partition_key = $2 AND row_key = $3
            "#,
        )
        .bind(table)
        .bind(&key.partition_key)
        .bind(&key.row_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TableEntity::from))
    }

    async fn query(&self, table: &str, filter: &Filter) -> Result<Vec<TableEntity>, StorageError> {
        self.ensure_table(table).await?;

        let sql = match filter.field {
            KeyField::PartitionKey => {
                r#"
                SELECT partition_key, row_key, etag, updated_at, properties
                FROM table_entities
                WHERE table_name = $1 AND partition_key = $2
                ORDER BY partition_key, row_key
                "#
            }
            KeyField::RowKey => {
                r#"
                SELECT partition_key, row_key, etag, updated_at, properties
                FROM table_entities
                WHERE table_name = $1 AND row_key = $2
                ORDER BY partition_key, row_key
                "#
            }
        };

        let rows: Vec<EntityRow> = sqlx::query_as(sql)
            .bind(table)
            .bind(&filter.value)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(TableEntity::from).collect())
    }

    async fn insert(
        &self,
        table: &str,
        key: &StorageKey,
        properties: Properties,
    ) -> Result<TableEntity, StorageError> {
        self.ensure_table(table).await?;

        let entity = TableEntity {
            key: key.clone(),
            etag: new_etag(),
            timestamp: Utc::now(),
            properties,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO table_entities
                (table_name, partition_key, row_key, etag, updated_at, properties)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(table)
        .bind(&key.partition_key)
        .bind(&key.row_key)
        .bind(&entity.etag)
        .bind(entity.timestamp)
        .bind(Json(&entity.properties))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(key.clone()));
        }

        Ok(entity)
    }

    async fn replace(
        &self,
        table: &str,
        key: &StorageKey,
        properties: Properties,
        if_match: &str,
    ) -> Result<TableEntity, StorageError> {
        self.ensure_table(table).await?;

        let entity = TableEntity {
            key: key.clone(),
            etag: new_etag(),
            timestamp: Utc::now(),
            properties,
        };

        // The etag comparison happens inside the UPDATE so that two writers
        // racing on the same version cannot both succeed.
        let result = sqlx::query(
            r#"
            UPDATE table_entities
            SET etag = $4, updated_at = $5, properties = $6
            WHERE table_name = $1 AND partition_key = $2 AND row_key = $3
                AND etag = $7
            "#,
        )
        .bind(table)
        .bind(&key.partition_key)
        .bind(&key.row_key)
        .bind(&entity.etag)
        .bind(entity.timestamp)
        .bind(Json(&entity.properties))
        .bind(if_match)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(entity);
        }

        match Self::current_etag(&self.pool, table, key).await? {
            Some(_) => Err(StorageError::PreconditionFailed(key.clone())),
            None => Err(StorageError::NotFound(key.clone())),
        }
    }

    async fn execute_batch(
        &self,
        table: &str,
        operations: Vec<BatchOperation>,
    ) -> Result<(), StorageError> {
        validate_batch(&operations)?;
        self.ensure_table(table).await?;

        let mut transaction = self.pool.begin().await?;

        for operation in &operations {
            match operation {
                BatchOperation::Delete { key, etag } => {
                    // Lock the row so the etag check and the delete see the same version.
                    let stored = sqlx::query_scalar::<_, String>(
                        r#"
                        SELECT etag FROM table_entities
                        WHERE table_name = $1 AND partition_key = $2 AND row_key = $3
                        FOR UPDATE
                        "#,
                    )
                    .bind(table)
                    .bind(&key.partition_key)
                    .bind(&key.row_key)
                    .fetch_optional(&mut *transaction)
                    .await?;

                    match stored {
                        None => return Err(StorageError::NotFound(key.clone())),
                        Some(stored) if !etag_matches(&stored, etag) => {
                            return Err(StorageError::PreconditionFailed(key.clone()))
                        }
                        Some(_) => {}
                    }

                    sqlx::query(
                        r#"
                        DELETE FROM table_entities
                        WHERE table_name = $1 AND partition_key = $2 AND row_key = $3
                        "#,
                    )
                    .bind(table)
                    .bind(&key.partition_key)
                    .bind(&key.row_key)
                    .execute(&mut *transaction)
                    .await?;
                }
            }
        }

        transaction.commit().await?;
        Ok(())
    }
}
