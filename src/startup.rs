//! src/startup.rs
use crate::configuration::{Settings, StorageBackend};
use crate::provision::ensure_storage_resources;
use crate::routes::{
    create_mailing_list, create_mailing_list_form, delete_mailing_list, delete_mailing_list_form,
    edit_mailing_list, edit_mailing_list_form, health_check, list_mailing_lists,
    mailing_list_details,
};
use crate::storage::{InMemoryTableClient, PgTableClient, TableClient};
use crate::store::MailingListStore;
use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub async fn build(config: Settings) -> Result<Application, anyhow::Error> {
    let client = storage_client(&config).await?;
    build_with_client(config, client).await
}

/// Like `build`, but serves from an already constructed backend.
pub async fn build_with_client(
    config: Settings,
    client: Arc<dyn TableClient>,
) -> Result<Application, anyhow::Error> {
    ensure_storage_resources(client.as_ref(), &config.storage).await?;

    let store = MailingListStore::new(
        client,
        config.storage.mailing_list_table.clone(),
        config.storage.list_query.request_options(),
    );

    let address = format!("{}:{}", config.application.host, config.application.port);
    let tcp_listener =
        TcpListener::bind(&address).with_context(|| format!("Failed to bind {}", address))?;
    let port = tcp_listener.local_addr()?.port();

    let server = run(tcp_listener, store)?;

    Ok(Application { port, server })
}

async fn storage_client(config: &Settings) -> Result<Arc<dyn TableClient>, anyhow::Error> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using the in-memory storage backend");
            Ok(Arc::new(InMemoryTableClient::new()))
        }
        StorageBackend::Postgres => {
            let pool = PgPool::connect_lazy(config.database.connection_string().expose_secret())
                .context("Failed to create the Postgres pool")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to migrate the database")?;
            Ok(Arc::new(PgTableClient::new(pool)))
        }
    }
}

pub fn run(listener: TcpListener, store: MailingListStore) -> Result<Server, std::io::Error> {
    let store = web::Data::new(store);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/mailinglists", web::get().to(list_mailing_lists))
            .route("/mailinglists/create", web::get().to(create_mailing_list_form))
            .route("/mailinglists/create", web::post().to(create_mailing_list))
            .route("/mailinglists/{list_name}", web::get().to(mailing_list_details))
            .route(
                "/mailinglists/{list_name}/edit",
                web::get().to(edit_mailing_list_form),
            )
            .route(
                "/mailinglists/{list_name}/edit",
                web::post().to(edit_mailing_list),
            )
            .route(
                "/mailinglists/{list_name}/delete",
                web::get().to(delete_mailing_list_form),
            )
            .route(
                "/mailinglists/{list_name}/delete",
                web::post().to(delete_mailing_list),
            )
            .app_data(store.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
