//! src/provision.rs
use crate::configuration::StorageSettings;
use crate::storage::{ResourceKind, TableClient};
use anyhow::Context;

/// Makes sure every table, blob container and queue the application uses
/// exists. Safe to run on every start.
#[tracing::instrument(name = "Provisioning storage resources", skip(client, settings))]
pub async fn ensure_storage_resources(
    client: &dyn TableClient,
    settings: &StorageSettings,
) -> Result<(), anyhow::Error> {
    for table in [&settings.mailing_list_table, &settings.message_table] {
        let created = client
            .create_table_if_not_exists(table)
            .await
            .with_context(|| format!("Failed to create table {}", table))?;
        tracing::info!(created, "Table {} is ready", table);
    }

    let resources = [
        (ResourceKind::BlobContainer, &settings.blob_container),
        (ResourceKind::Queue, &settings.queue),
    ];
    for (kind, name) in resources {
        let created = client
            .create_resource_if_not_exists(kind, name)
            .await
            .with_context(|| format!("Failed to create {} {}", kind.as_str(), name))?;
        tracing::info!(created, "{} {} is ready", kind.as_str(), name);
    }

    Ok(())
}
