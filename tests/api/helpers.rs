//! tests/api/helpers.rs

use mailroom::configuration::{get_configuration, DatabaseSettings, Settings};
use mailroom::domain::MAILING_LIST_ROW_KEY;
use mailroom::startup::build_with_client;
use mailroom::storage::{
    InMemoryTableClient, InstrumentedTableClient, StorageKey, TableClient, TableEntity,
};
use mailroom::telemetry::{get_subscriber, init_subscriber};
use once_cell::sync::Lazy;
use secrecy::ExposeSecret;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    // Set TEST_LOG=true to see logs during tests
    // Use bunyan to format the logs nicely:
    // $ TEST_LOG=true cargo test | bunyan
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    };
});

pub struct TestApp {
    pub address: String,
    pub storage: Arc<InstrumentedTableClient<InMemoryTableClient>>,
    pub table: String,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_html(&self, path: &str) -> String {
        self.get(path).await.text().await.unwrap()
    }

    pub async fn post_body(&self, path: &str, body: String) -> reqwest::Response {
        self.api_client
            .post(&format!("{}{}", self.address, path))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.api_client
            .post(&format!("{}{}", self.address, path))
            .form(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn create_list(
        &self,
        name: &str,
        from: &str,
        description: &str,
    ) -> reqwest::Response {
        self.post_form(
            "/mailinglists/create",
            &[
                ("list_name", name),
                ("from_email_address", from),
                ("description", description),
            ],
        )
        .await
    }

    pub async fn edit_list(
        &self,
        name: &str,
        from: &str,
        description: &str,
        etag: &str,
    ) -> reqwest::Response {
        self.post_form(
            &format!("/mailinglists/{}/edit", name),
            &[
                ("from_email_address", from),
                ("description", description),
                ("etag", etag),
            ],
        )
        .await
    }

    pub async fn stored(&self, partition_key: &str, row_key: &str) -> Option<TableEntity> {
        self.storage
            .retrieve(&self.table, &StorageKey::new(partition_key, row_key))
            .await
            .expect("Failed to read from storage.")
    }

    pub async fn stored_list(&self, name: &str) -> TableEntity {
        self.stored(name, MAILING_LIST_ROW_KEY)
            .await
            .expect("Mailing list was not stored.")
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customise: impl FnOnce(&mut Settings)) -> TestApp {
    Lazy::force(&TRACING);

    let mut config = get_configuration().expect("Failed to read configuration.");
    config.application.port = 0;
    customise(&mut config);

    let storage = Arc::new(InstrumentedTableClient::new(InMemoryTableClient::new()));
    let table = config.storage.mailing_list_table.clone();

    let app = build_with_client(config, storage.clone())
        .await
        .expect("Failed to build application.");
    let address = format!("http://127.0.0.1:{}", app.port());

    // Launch the server as a background task
    let _ = tokio::spawn(app.run());

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address,
        storage,
        table,
        api_client,
    }
}

/// Creates a fresh, migrated database for a single test.
pub async fn configure_database() -> PgPool {
    Lazy::force(&TRACING);

    let mut config = get_configuration().expect("Failed to read configuration.");
    config.database.database_name = Uuid::new_v4().to_string();
    create_database(&config.database).await
}

async fn create_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection =
        PgConnection::connect(config.connection_string_without_db().expose_secret())
            .await
            .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    // Migrate database
    let db_pool = PgPool::connect(config.connection_string().expose_secret())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to migrate the database");

    db_pool
}

pub fn assert_is_redirect_to(response: &reqwest::Response, location: &str) {
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(response.headers().get("Location").unwrap(), location);
}

/// Pulls the hidden `etag` input out of a rendered edit form.
pub fn extract_etag(html: &str) -> String {
    let marker = r#"name="etag" value=""#;
    let start = html.find(marker).expect("No etag field in the form.") + marker.len();
    let end = start + html[start..].find('"').unwrap();
    html[start..end].replace("&quot;", "\"").replace("&amp;", "&")
}
